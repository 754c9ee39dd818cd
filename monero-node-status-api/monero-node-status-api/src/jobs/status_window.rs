// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use strum_macros::FromRepr;

pub(crate) const WINDOW_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub(crate) enum CheckStatus {
    Offline = 0,
    Online = 1,
    NotApplicable = 2,
}

impl From<bool> for CheckStatus {
    fn from(online: bool) -> Self {
        if online {
            CheckStatus::Online
        } else {
            CheckStatus::Offline
        }
    }
}

/// Outcomes of the last [`WINDOW_SIZE`] probes of a node, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatusWindow([CheckStatus; WINDOW_SIZE]);

impl Default for StatusWindow {
    fn default() -> Self {
        StatusWindow([CheckStatus::NotApplicable; WINDOW_SIZE])
    }
}

impl StatusWindow {
    /// Parses a stored window. Anything that isn't exactly five known
    /// statuses yields a fresh window instead of an error.
    pub(crate) fn parse_or_reset(raw: &str) -> Self {
        serde_json::from_str::<serde_json::Value>(raw)
            .map(|value| Self::from_value_or_reset(&value))
            .unwrap_or_default()
    }

    pub(crate) fn from_value_or_reset(value: &serde_json::Value) -> Self {
        Self::try_from_value(value).unwrap_or_default()
    }

    fn try_from_value(value: &serde_json::Value) -> Option<Self> {
        let slots = value.as_array()?;
        if slots.len() != WINDOW_SIZE {
            return None;
        }

        let mut window = [CheckStatus::NotApplicable; WINDOW_SIZE];
        for (slot, raw) in window.iter_mut().zip(slots) {
            let code = u8::try_from(raw.as_u64()?).ok()?;
            *slot = CheckStatus::from_repr(code)?;
        }
        Some(StatusWindow(window))
    }

    /// Drops the oldest slot and appends `status` as the newest one.
    #[must_use]
    pub(crate) fn advance(self, status: CheckStatus) -> Self {
        let mut slots = self.0;
        slots.rotate_left(1);
        slots[WINDOW_SIZE - 1] = status;
        StatusWindow(slots)
    }

    pub(crate) fn codes(&self) -> [u8; WINDOW_SIZE] {
        self.0.map(|status| status as u8)
    }

    pub(crate) fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self.codes().to_vec())
    }
}

impl fmt::Display for StatusWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes = self.codes();
        write!(
            f,
            "[{},{},{},{},{}]",
            codes[0], codes[1], codes[2], codes[3], codes[4]
        )
    }
}
