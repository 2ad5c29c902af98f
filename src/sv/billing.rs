//! Billing arithmetic shared by the invoice generator, the payment processor
//! and the reports. Amounts are integer sen.

use serde::{Deserialize, Serialize};

use crate::{prelude::*, utils};

/// 1 rupiah = 100 sen
pub const SEN_PER_RUPIAH: i64 = 100;

/// Admin fee used by the revenue fallback when no payment rows exist.
pub const FALLBACK_ADMIN_FEE: i64 = 2_500 * SEN_PER_RUPIAH;

/// Admin fee used for dashboard estimates when no method is active.
pub const DEFAULT_ADMIN_FEE: i64 = 5_000 * SEN_PER_RUPIAH;

/// Highest cumulative meter reading a nine-digit kWh register can show.
pub const MAX_READING: i64 = 999_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
  pub month: i32,
  pub year: i32,
}

impl Period {
  pub fn new(month: i32, year: i32) -> Self {
    Self { month, year }
  }

  pub fn validate(&self, min_year: i32, max_year: i32) -> Result<()> {
    if !(1..=12).contains(&self.month) {
      return Err(Error::validation("month", "must be between 1 and 12"));
    }
    if self.year < min_year || self.year > max_year {
      return Err(Error::validation(
        "year",
        format!("must be between {min_year} and {max_year}"),
      ));
    }
    Ok(())
  }

  pub fn previous(&self) -> Self {
    if self.month <= 1 {
      Self { month: 12, year: self.year - 1 }
    } else {
      Self { month: self.month - 1, year: self.year }
    }
  }

  pub fn of(date: Date) -> Self {
    Self { month: date.month() as i32, year: date.year() }
  }

  /// First day of this period and of the following one.
  pub fn date_range(&self) -> Option<(Date, Date)> {
    let start = Date::from_ymd_opt(self.year, self.month as u32, 1)?;
    let end = if self.month == 12 {
      Date::from_ymd_opt(self.year + 1, 1, 1)?
    } else {
      Date::from_ymd_opt(self.year, self.month as u32 + 1, 1)?
    };
    Some((start, end))
  }
}

impl std::fmt::Display for Period {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", utils::month_name(self.month), self.year)
  }
}

/// What staff typed into the invoice form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterInput {
  /// New cumulative reading at the end of the period.
  EndReading(i64),
  /// kWh used in the period; the end reading is derived from the previous one.
  Consumption(i64),
}

impl MeterInput {
  /// Resolves the end reading given the previous period's end.
  pub fn end_reading(self, previous_end: i64) -> Result<i64> {
    match self {
      MeterInput::EndReading(end) if end < 0 => {
        Err(Error::validation("meter_end", "must not be negative"))
      }
      MeterInput::EndReading(end) if end < previous_end => {
        Err(Error::validation(
          "meter_end",
          format!("must not be below the previous reading {previous_end}"),
        ))
      }
      MeterInput::EndReading(end) if end > MAX_READING => {
        Err(Error::validation(
          "meter_end",
          format!("must not exceed {MAX_READING}"),
        ))
      }
      MeterInput::EndReading(end) => Ok(end),
      MeterInput::Consumption(kwh) if kwh < 0 => {
        Err(Error::validation("kwh", "must not be negative"))
      }
      MeterInput::Consumption(kwh) => previous_end
        .checked_add(kwh)
        .filter(|end| *end <= MAX_READING)
        .ok_or_else(|| {
          Error::validation(
            "kwh",
            format!("would push the meter past {MAX_READING}"),
          )
        }),
    }
  }
}

pub fn consumption(start: i64, end: i64) -> i64 {
  (end - start).max(0)
}

/// `kwh × price`, or `None` when it does not fit in sen.
pub fn energy(kwh: i64, price_per_kwh: i64) -> Option<i64> {
  kwh.checked_mul(price_per_kwh)
}

/// `kwh × price + admin fee + adjustment`, all in sen.
pub fn amount(
  kwh: i64,
  price_per_kwh: i64,
  admin_fee: i64,
  adjustment: i64,
) -> Result<i64> {
  energy(kwh, price_per_kwh)
    .and_then(|energy| energy.checked_add(admin_fee))
    .and_then(|total| total.checked_add(adjustment))
    .ok_or_else(|| Error::validation("amount", "is too large to bill"))
}

#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
  pub kwh: i64,
  pub price_per_kwh: i64,
  pub energy: i64,
  pub admin_fee: i64,
  pub adjustment: i64,
  pub total: i64,
}

impl Breakdown {
  pub fn new(
    kwh: i64,
    price_per_kwh: i64,
    admin_fee: i64,
    adjustment: i64,
  ) -> Result<Self> {
    Ok(Self {
      kwh,
      price_per_kwh,
      energy: energy(kwh, price_per_kwh)
        .ok_or_else(|| Error::validation("amount", "is too large to bill"))?,
      admin_fee,
      adjustment,
      total: amount(kwh, price_per_kwh, admin_fee, adjustment)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reference_bill() {
    // 1467.28 Rp/kWh, 1250 -> 1395, admin fee 2500 Rp
    let kwh = consumption(1250, 1395);
    assert_eq!(kwh, 145);
    assert_eq!(amount(kwh, 146_728, 250_000, 0).unwrap(), 21_525_560);
  }

  #[test]
  fn test_consumption_is_floored() {
    assert_eq!(consumption(100, 90), 0);
    assert_eq!(consumption(100, 100), 0);
  }

  #[test]
  fn test_adjustment_is_signed() {
    assert_eq!(amount(10, 100, 50, -50).unwrap(), 1_000);
    assert_eq!(amount(10, 100, 50, 25).unwrap(), 1_075);
  }

  #[test]
  fn test_amount_overflow_is_rejected() {
    assert_eq!(energy(i64::MAX, 2), None);
    assert!(matches!(
      amount(100_000_000_000_000, 146_728, 250_000, 0),
      Err(Error::Validation { field: "amount", .. })
    ));
    assert!(matches!(
      amount(1, 1, i64::MAX, 1),
      Err(Error::Validation { field: "amount", .. })
    ));
    assert!(Breakdown::new(i64::MAX, 146_728, 0, 0).is_err());
  }

  #[test]
  fn test_meter_reading_ceiling() {
    assert_eq!(
      MeterInput::EndReading(MAX_READING).end_reading(0).unwrap(),
      MAX_READING
    );
    assert!(matches!(
      MeterInput::EndReading(100_000_000_000_000).end_reading(0),
      Err(Error::Validation { field: "meter_end", .. })
    ));
    assert!(matches!(
      MeterInput::Consumption(i64::MAX).end_reading(1),
      Err(Error::Validation { field: "kwh", .. })
    ));
    assert!(matches!(
      MeterInput::Consumption(10).end_reading(MAX_READING),
      Err(Error::Validation { field: "kwh", .. })
    ));
  }

  #[test]
  fn test_period_validation() {
    assert!(Period::new(7, 2025).validate(2024, 2030).is_ok());
    assert!(matches!(
      Period::new(13, 2025).validate(2024, 2030),
      Err(Error::Validation { field: "month", .. })
    ));
    assert!(matches!(
      Period::new(0, 2025).validate(2024, 2030),
      Err(Error::Validation { field: "month", .. })
    ));
    assert!(matches!(
      Period::new(1, 2031).validate(2024, 2030),
      Err(Error::Validation { field: "year", .. })
    ));
  }

  #[test]
  fn test_previous_wraps_year() {
    assert_eq!(Period::new(1, 2025).previous(), Period::new(12, 2024));
    assert_eq!(Period::new(7, 2025).previous(), Period::new(6, 2025));
  }

  #[test]
  fn test_display() {
    assert_eq!(Period::new(7, 2025).to_string(), "Juli 2025");
  }

  #[test]
  fn test_meter_input() {
    assert_eq!(MeterInput::Consumption(100).end_reading(1100).unwrap(), 1200);
    assert_eq!(MeterInput::EndReading(1395).end_reading(1250).unwrap(), 1395);
    assert!(matches!(
      MeterInput::EndReading(1000).end_reading(1250),
      Err(Error::Validation { field: "meter_end", .. })
    ));
    assert!(matches!(
      MeterInput::Consumption(-1).end_reading(0),
      Err(Error::Validation { field: "kwh", .. })
    ));
  }

  #[test]
  fn test_breakdown() {
    let b = Breakdown::new(145, 146_728, 250_000, 0).unwrap();
    assert_eq!(b.energy, 21_275_560);
    assert_eq!(b.total, 21_525_560);
  }

  #[test]
  fn test_date_range() {
    let (start, end) = Period::new(12, 2025).date_range().unwrap();
    assert_eq!(start, Date::from_ymd_opt(2025, 12, 1).unwrap());
    assert_eq!(end, Date::from_ymd_opt(2026, 1, 1).unwrap());
  }
}
