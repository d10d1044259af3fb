use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A Ticket's status transitions obey a fixed graph: no other
/// transitions occur. `available -> held -> reserved -> sold`, with
/// `release`/reap returning `held` to `available` and `cancel` returning
/// `reserved`/`sold` to `available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Available,
    Held,
    Reserved,
    Sold,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Available => "available",
            TicketStatus::Held => "held",
            TicketStatus::Reserved => "reserved",
            TicketStatus::Sold => "sold",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub seat_no: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference seat identifier generator: `S` + 1-based index zero-padded
/// to three digits (`S001`..`S999`).
pub fn seat_no_for_index(index: u32) -> String {
    format!("S{:03}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_no_format() {
        assert_eq!(seat_no_for_index(1), "S001");
        assert_eq!(seat_no_for_index(96), "S096");
        assert_eq!(seat_no_for_index(1000), "S1000");
    }
}
