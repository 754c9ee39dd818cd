// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub(super) struct ApiPaths {
    server_address: String,
}

impl ApiPaths {
    pub(super) fn new(server_address: String) -> Self {
        Self { server_address }
    }

    pub(super) fn request_job(&self) -> String {
        format!("{}/api/v1/job", self.server_address)
    }

    pub(super) fn submit_report(&self) -> String {
        format!("{}/api/v1/job", self.server_address)
    }
}
