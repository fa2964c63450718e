//! Customer records and visit cadence.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How often a customer is visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    /// The cycle's next date after `last`: 7 or 14 days, or one calendar
    /// month.
    pub fn advance(&self, last: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Weekly => last.checked_add_days(Days::new(7)).unwrap_or(last),
            Frequency::Biweekly => last.checked_add_days(Days::new(14)).unwrap_or(last),
            Frequency::Monthly => last.checked_add_months(Months::new(1)).unwrap_or(last),
        }
    }
}

/// A customer and the property details that shape their visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub price: f64,
    pub square_footage: u32,
    pub frequency: Frequency,
    pub next_cut_date: Option<NaiveDate>,
    pub last_cut_date: Option<NaiveDate>,
    pub is_hilly: bool,
    pub has_fencing: bool,
    pub has_obstacles: bool,
}

impl Customer {
    /// Create a customer with the given cadence and no visit history.
    pub fn new(name: impl Into<String>, address: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address: address.into(),
            price: 0.0,
            square_footage: 0,
            frequency,
            next_cut_date: None,
            last_cut_date: None,
            is_hilly: false,
            has_fencing: false,
            has_obstacles: false,
        }
    }
}
