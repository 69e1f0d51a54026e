//! Application lifecycle status.

/// Where the application is in its lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Created = 0,
    Started = 1,
    Ended = 2,
}

impl From<u8> for AppStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => AppStatus::Started,
            2 => AppStatus::Ended,
            _ => AppStatus::Created,
        }
    }
}

impl AppStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppStatus::Created => "created",
            AppStatus::Started => "started",
            AppStatus::Ended => "ended",
        }
    }
}
