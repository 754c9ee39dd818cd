// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod ban_list;
pub(crate) mod cron;
pub(crate) mod fees;
pub(crate) mod nodes;
pub(crate) mod probe_logs;
pub(crate) mod probers;
pub(crate) mod rucknium;
