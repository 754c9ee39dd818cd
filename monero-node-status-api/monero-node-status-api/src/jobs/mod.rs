// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod dispatch;
pub(crate) mod report;
pub(crate) mod status_window;
