use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::parse_weekday_name;
use crate::filter::ViewMode;
use crate::holidays::HolidayCalendar;

const RC_ENV_VAR: &str = "DAYBOOKRC";
const RC_FILE_NAME: &str =
  ".daybookrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      (
        "data.location",
        "~/.daybook/events.json"
      ),
      ("calendar.week_start", "sunday"),
      ("default.view", "month"),
      ("default.command", "list"),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading daybookrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no daybookrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn week_start(
    &self
  ) -> anyhow::Result<Weekday> {
    let raw = self
      .get("calendar.week_start")
      .unwrap_or_else(|| {
        "sunday".to_string()
      });
    parse_weekday_name(&raw).ok_or_else(
      || {
        anyhow!(
          "invalid \
           calendar.week_start: {raw}"
        )
      }
    )
  }

  pub fn default_view(
    &self
  ) -> anyhow::Result<ViewMode> {
    let raw = self
      .get("default.view")
      .unwrap_or_else(|| {
        "month".to_string()
      });
    ViewMode::from_key(&raw).ok_or_else(
      || {
        anyhow!(
          "invalid default.view: {raw} \
           (expected week or month)"
        )
      }
    )
  }

  /// The built-in table unless `holidays.file` points elsewhere.
  pub fn holiday_calendar(
    &self
  ) -> anyhow::Result<HolidayCalendar> {
    match self.get("holidays.file") {
      | Some(raw)
        if !raw.trim().is_empty() =>
      {
        let path =
          expand_tilde(Path::new(&raw));
        HolidayCalendar::load(&path)
      }
      | _ => Ok(HolidayCalendar::builtin())
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Location of the events file: explicit override, then
/// `data.location`, then `~/.daybook/events.json`.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_events_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(path.to_path_buf());
  }

  if let Some(cfg_value) =
    cfg.get("data.location")
    && !cfg_value.trim().is_empty()
  {
    return Ok(expand_tilde(Path::new(
      &cfg_value
    )));
  }

  default_events_path()
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping daybookrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_events_path()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(
    home
      .join(".daybook")
      .join("events.json")
  )
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::Path;

  use chrono::Weekday;
  use tempfile::tempdir;

  use super::{
    Config,
    resolve_events_path
  };
  use crate::filter::ViewMode;

  #[test]
  fn loads_rc_with_includes_and_comments()
  {
    let dir =
      tempdir().expect("tempdir");
    let extra = dir.path().join("extra");
    fs::write(
      &extra,
      "calendar.week_start = monday\n"
    )
    .expect("write include");
    let rc = dir.path().join("rc");
    fs::write(
      &rc,
      "# personal settings\n\
       default.view = week # trailing\n\
       include extra\n\
       include missing\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.default_view().expect("view"),
      ViewMode::Week
    );
    assert_eq!(
      cfg
        .week_start()
        .expect("week start"),
      Weekday::Mon
    );
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("on")
    );
  }

  #[test]
  fn rejects_malformed_lines() {
    let dir =
      tempdir().expect("tempdir");
    let rc = dir.path().join("rc");
    fs::write(&rc, "just words\n")
      .expect("write rc");
    let err = Config::load(Some(rc.as_path()))
      .expect_err("malformed line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.calendar.week_start"
          .to_string(),
        "fri".to_string()
      ),
      (
        "color".to_string(),
        "off".to_string()
      )
    ]);
    assert_eq!(
      cfg
        .week_start()
        .expect("week start"),
      Weekday::Fri
    );
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
  }

  #[test]
  fn invalid_settings_are_errors() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "default.view".to_string(),
        "year".to_string()
      ),
      (
        "calendar.week_start"
          .to_string(),
        "someday".to_string()
      )
    ]);
    assert!(cfg.default_view().is_err());
    assert!(cfg.week_start().is_err());
  }

  #[test]
  fn events_path_prefers_override() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "data.location".to_string(),
      "/tmp/daybook/events.json"
        .to_string()
    )]);
    assert_eq!(
      resolve_events_path(&cfg, None)
        .expect("path"),
      Path::new(
        "/tmp/daybook/events.json"
      )
    );
    assert_eq!(
      resolve_events_path(
        &cfg,
        Some(Path::new("other.json"))
      )
      .expect("path"),
      Path::new("other.json")
    );
  }

  #[test]
  fn holiday_file_replaces_builtin() {
    let dir =
      tempdir().expect("tempdir");
    let file =
      dir.path().join("holidays.toml");
    fs::write(
      &file,
      "[holidays]\n\"2030-01-01\" = \
       \"New Year\"\n"
    )
    .expect("write holidays");

    let mut cfg = Config::default();
    assert!(
      cfg
        .holiday_calendar()
        .expect("builtin")
        .len()
        > 2
    );
    cfg.apply_overrides([(
      "holidays.file".to_string(),
      file.display().to_string()
    )]);
    let calendar = cfg
      .holiday_calendar()
      .expect("custom table");
    assert_eq!(calendar.len(), 1);
  }
}
