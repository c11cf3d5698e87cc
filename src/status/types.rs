//! The compact aggregate status value.
//!
//! Grammar: `<base>[:<qualifier>][:excluded]`. The value is persisted
//! verbatim by callers and read back by the UI, notification and auto-heal
//! logic, so `Display` is the canonical encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tag appended to statuses computed purely from excluded containers.
pub const EXCLUDED_TAG: &str = "excluded";

/// Base token of an aggregate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBase {
    Running,
    Degraded,
    Starting,
    Paused,
    Exited,
    Unknown,
}

impl StatusBase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBase::Running => "running",
            StatusBase::Degraded => "degraded",
            StatusBase::Starting => "starting",
            StatusBase::Paused => "paused",
            StatusBase::Exited => "exited",
            StatusBase::Unknown => "unknown",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "running" => Some(StatusBase::Running),
            "degraded" => Some(StatusBase::Degraded),
            "starting" => Some(StatusBase::Starting),
            "paused" => Some(StatusBase::Paused),
            "exited" => Some(StatusBase::Exited),
            "unknown" => Some(StatusBase::Unknown),
            _ => None,
        }
    }
}

/// Health qualifier of an aggregate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Healthy,
    Unhealthy,
    Unknown,
}

impl Qualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Healthy => "healthy",
            Qualifier::Unhealthy => "unhealthy",
            Qualifier::Unknown => "unknown",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "healthy" => Some(Qualifier::Healthy),
            "unhealthy" => Some(Qualifier::Unhealthy),
            "unknown" => Some(Qualifier::Unknown),
            _ => None,
        }
    }
}

/// Aggregate status of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateStatus {
    base: StatusBase,
    qualifier: Option<Qualifier>,
    excluded: bool,
}

impl AggregateStatus {
    pub const fn new(base: StatusBase, qualifier: Option<Qualifier>) -> Self {
        Self {
            base,
            qualifier,
            excluded: false,
        }
    }

    /// `running:<qualifier>`
    pub const fn running(qualifier: Qualifier) -> Self {
        Self::new(StatusBase::Running, Some(qualifier))
    }

    /// `degraded:unhealthy`
    pub const fn degraded() -> Self {
        Self::new(StatusBase::Degraded, Some(Qualifier::Unhealthy))
    }

    /// `starting:unknown`
    pub const fn starting() -> Self {
        Self::new(StatusBase::Starting, Some(Qualifier::Unknown))
    }

    /// `paused:unknown`
    pub const fn paused() -> Self {
        Self::new(StatusBase::Paused, Some(Qualifier::Unknown))
    }

    /// `exited`, the terminal state. Also returned for an empty container set.
    pub const fn exited() -> Self {
        Self::new(StatusBase::Exited, None)
    }

    /// `unknown:unknown:excluded`, the result when no excluded container exists.
    pub const fn unknown_excluded() -> Self {
        Self {
            base: StatusBase::Unknown,
            qualifier: Some(Qualifier::Unknown),
            excluded: true,
        }
    }

    /// Same status carrying the trailing `:excluded` tag.
    pub const fn with_excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn base(&self) -> StatusBase {
        self.base
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn is_running(&self) -> bool {
        self.base == StatusBase::Running
    }

    /// True when the status should drive alerts and auto-heal.
    pub fn is_unhealthy(&self) -> bool {
        !self.excluded
            && (self.base == StatusBase::Degraded || self.qualifier == Some(Qualifier::Unhealthy))
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())?;
        if let Some(qualifier) = self.qualifier {
            write!(f, ":{}", qualifier.as_str())?;
        }
        if self.excluded {
            write!(f, ":{}", EXCLUDED_TAG)?;
        }
        Ok(())
    }
}

/// Error returned when a string is not in canonical aggregate grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid aggregate status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for AggregateStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseStatusError(s.to_string());
        let mut parts = s.split(':');
        let base = parts
            .next()
            .and_then(StatusBase::parse)
            .ok_or_else(invalid)?;

        let mut status = AggregateStatus::new(base, None);
        match parts.next() {
            None => return Ok(status),
            Some(EXCLUDED_TAG) => status.excluded = true,
            Some(token) => status.qualifier = Some(Qualifier::parse(token).ok_or_else(invalid)?),
        }
        match parts.next() {
            None => {}
            Some(EXCLUDED_TAG) if !status.excluded => status.excluded = true,
            Some(_) => return Err(invalid()),
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(status)
    }
}

impl Serialize for AggregateStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AggregateStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
