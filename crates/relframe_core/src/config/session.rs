use std::collections::HashMap;
use std::sync::LazyLock;

use relframe_error::{RelError, Result};

use super::execution::ExecutionConfig;
use crate::arrays::compute::cast::parse::{BoolParser, Int64Parser, Parser};
use crate::arrays::scalar::ScalarValue;
use crate::format::FormatOptions;
use crate::ops::join::JoinOptions;

pub const DEFAULT_DISPLAY_MAX_ROWS: usize = 20;
pub const MAX_DISPLAY_MAX_ROWS: usize = 10_000;

/// Configuration for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub enable_parallel: bool,
    pub join_nulls_equal: bool,
    pub display_max_rows: usize,
    pub display_null: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            enable_parallel: true,
            join_nulls_equal: true,
            display_max_rows: DEFAULT_DISPLAY_MAX_ROWS,
            display_null: "NA".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS.get(name).ok_or_else(|| missing_setting(name))?;
        (func.set)(value, self)
    }

    /// Set a value from a string, e.g. from a command line `name=value`.
    ///
    /// The string is interpreted as a bool or integer if it parses as one,
    /// otherwise it's used as a string.
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let scalar = if let Some(b) = BoolParser.parse(value) {
            ScalarValue::Boolean(b)
        } else if let Some(i) = Int64Parser::new().parse(value) {
            ScalarValue::Int64(i)
        } else {
            ScalarValue::Utf8(value.to_string())
        };
        self.set_from_scalar(name, scalar)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS.get(name).ok_or_else(|| missing_setting(name))?;
        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let func = GET_SET_FUNCTIONS.get(name).ok_or_else(|| missing_setting(name))?;
        let scalar = (func.get)(&def_conf);
        (func.set)(scalar, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Names and descriptions of all settings, sorted by name.
    pub fn describe_settings() -> Vec<(&'static str, &'static str)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
            .collect();
        settings.sort_unstable();
        settings
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            enable_parallel: self.enable_parallel,
        }
    }

    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            nulls_equal: self.join_nulls_equal,
            ..Default::default()
        }
    }

    pub fn format_options(&self) -> FormatOptions<'_> {
        FormatOptions {
            null: &self.display_null,
            max_rows: self.display_max_rows,
            ..Default::default()
        }
    }
}

fn missing_setting(name: &str) -> RelError {
    RelError::invalid_argument(format!("Missing setting for '{name}'"))
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<EnableParallel>(&mut map);
    insert_setting::<JoinNullsEqual>(&mut map);
    insert_setting::<DisplayMaxRows>(&mut map);
    insert_setting::<DisplayNull>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue;
}

pub struct EnableParallel;

impl SessionSetting for EnableParallel {
    const NAME: &'static str = "enable_parallel";
    const DESCRIPTION: &'static str = "Compute independent aggregates on multiple threads";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.enable_parallel = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.enable_parallel.into()
    }
}

pub struct JoinNullsEqual;

impl SessionSetting for JoinNullsEqual {
    const NAME: &'static str = "join_nulls_equal";
    const DESCRIPTION: &'static str = "Whether missing join keys match each other";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.join_nulls_equal = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.join_nulls_equal.into()
    }
}

pub struct DisplayMaxRows;

impl SessionSetting for DisplayMaxRows {
    const NAME: &'static str = "display_max_rows";
    const DESCRIPTION: &'static str = "Maximum number of rows shown when printing a relation";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_as_usize()?;
        if !(1..=MAX_DISPLAY_MAX_ROWS).contains(&val) {
            return Err(RelError::invalid_argument(format!(
                "'{}' must be between 1 and {MAX_DISPLAY_MAX_ROWS}",
                Self::NAME
            ))
            .with_field("value", val));
        }
        conf.display_max_rows = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.display_max_rows.into()
    }
}

pub struct DisplayNull;

impl SessionSetting for DisplayNull {
    const NAME: &'static str = "display_null";
    const DESCRIPTION: &'static str = "Text shown for missing values when printing a relation";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.display_null = scalar.try_into_string()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.display_null.clone().into()
    }
}
