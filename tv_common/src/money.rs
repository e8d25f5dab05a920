use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::op;

pub const NPR_CURRENCY_CODE: &str = "NPR";

//--------------------------------------      Rupees       -----------------------------------------------------------
/// A monetary amount in Nepali rupees, stored as an integer number of paisa (1 Re = 100 paisa).
///
/// Keeping amounts in minor units avoids floating-point drift in fee splits and lets the value map directly onto an
/// INTEGER column.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Mul<i64> for Rupees {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rupees {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rupees {}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let paisa = self.0.abs();
        write!(f, "{sign}Rs{}.{:02}", paisa / 100, paisa % 100)
    }
}

impl Rupees {
    /// The value in paisa.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Truncating integer percentage. `Rupees::from_rupees(1000).percent(3)` is exactly Rs30.00.
    pub fn percent(&self, pct: i64) -> Self {
        Self(self.0 * pct / 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}
