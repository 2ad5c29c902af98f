use crate::prelude::*;

pub const MONTH_NAMES: [&str; 12] = [
  "Januari",
  "Februari",
  "Maret",
  "April",
  "Mei",
  "Juni",
  "Juli",
  "Agustus",
  "September",
  "Oktober",
  "November",
  "Desember",
];

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}

pub fn today() -> Date {
  Utc::now().date_naive()
}

pub fn month_name(month: i32) -> &'static str {
  usize::try_from(month - 1)
    .ok()
    .and_then(|idx| MONTH_NAMES.get(idx))
    .copied()
    .unwrap_or("Bulan")
}

/// Rupiah with `.` thousands and `,` decimals: `Rp 215.255,60`.
pub fn format_rupiah(sen: i64) -> String {
  let sign = if sen < 0 { "-" } else { "" };
  let sen = sen.unsigned_abs();
  format!("{sign}Rp {},{:02}", group_thousands(sen / 100), sen % 100)
}

/// Whole rupiah, decimals dropped: `Rp 1.467`.
pub fn format_rupiah_whole(sen: i64) -> String {
  let rupiah = (sen as f64 / 100.0).round() as i64;
  let sign = if rupiah < 0 { "-" } else { "" };
  format!("{sign}Rp {}", group_thousands(rupiah.unsigned_abs()))
}

fn group_thousands(value: u64) -> String {
  let digits = value.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push('.');
    }
    out.push(ch);
  }
  out
}

/// Converts a rupiah amount such as `1467.28` into sen.
pub fn rupiah_to_sen(rupiah: f64) -> i64 {
  (rupiah * 100.0).round() as i64
}

pub fn format_date(date: DateTime) -> String {
  date.format("%d/%m/%Y").to_string()
}

/// Builds a public URL for a file kept under the storage directory.
pub fn storage_url(base: &str, dir: &str, file: Option<&str>) -> Option<String> {
  file.map(|file| format!("{}/storage/{dir}/{file}", base.trim_end_matches('/')))
}
