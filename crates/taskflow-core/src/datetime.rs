use std::fs;
use std::path::PathBuf;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::stats::Stats;
use crate::task::Task;

const TIMEZONE_CONFIG_FILE: &str =
  "taskflow-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "TASKFLOW_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "TASKFLOW_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// The zone whose calendar days count as "today" for statistics and due
/// dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
  Named(Tz),
  System
}

impl Zone {
  /// Env var first, then the config value, then a `taskflow-time.toml`
  /// file; the system zone otherwise.
  #[tracing::instrument]
  pub fn resolve(
    configured: Option<&str>
  ) -> Self {
    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
      && let Some(tz) =
        parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
      return Zone::Named(tz);
    }

    if let Some(raw) = configured
      && let Some(tz) =
        parse_timezone(raw, "config")
    {
      return Zone::Named(tz);
    }

    if let Some(path) =
      timezone_config_path()
      && let Some(tz) =
        load_timezone_from_file(&path)
    {
      return Zone::Named(tz);
    }

    Zone::System
  }

  pub fn today(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Zone::Named(tz) => {
        now.with_timezone(tz).date_naive()
      }
      | Zone::System => {
        now
          .with_timezone(&Local)
          .date_naive()
      }
    }
  }

  pub fn stats(
    &self,
    tasks: &[Task],
    now: DateTime<Utc>
  ) -> Stats {
    match self {
      | Zone::Named(tz) => {
        Stats::compute(
          tasks,
          &now.with_timezone(tz)
        )
      }
      | Zone::System => {
        Stats::compute(
          tasks,
          &now.with_timezone(&Local)
        )
      }
    }
  }
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::warn!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::warn!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses a due-date expression relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return step_days(today, 1);
    }
    | "yesterday" => {
      return step_days(today, -1);
    }
    | "eow" => {
      let remaining = 6 - today
        .weekday()
        .num_days_from_monday()
        as i64;
      return step_days(
        today, remaining
      );
    }
    | "eom" => {
      return end_of_month(today);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    let signed = if &caps["sign"] == "-"
    {
      -days
    } else {
      days
    };
    return step_days(today, signed);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd/+Nw, eow, eom, \
     YYYY-MM-DD"
  })
}

fn step_days(
  from: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  let magnitude = Days::new(
    days.unsigned_abs()
  );
  let stepped = if days < 0 {
    from.checked_sub_days(magnitude)
  } else {
    from.checked_add_days(magnitude)
  };
  stepped.ok_or_else(|| {
    anyhow!(
      "date out of range: {from} \
       {days:+} days"
    )
  })
}

fn end_of_month(
  date: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let (year, month) =
    if date.month() == 12 {
      (date.year() + 1, 1)
    } else {
      (date.year(), date.month() + 1)
    };
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .and_then(|first| first.pred_opt())
  .ok_or_else(|| {
    anyhow!(
      "failed to compute end of \
       month for {date}"
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Next occurrence strictly after `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as u64;
  let target_idx = target
    .num_days_from_monday()
    as u64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(delta))
    .unwrap_or(from)
}
