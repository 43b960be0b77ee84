//! # Profile Document Module
//!
//! The persisted shape of the profile collection:
//!
//! ```json
//! { "current": "Default",
//!   "profiles": [ { "name": "Default", "degrees": 540, "power": 50, ... } ] }
//! ```
//!
//! Profiles are stored flat, one key per catalog parameter next to `name`.
//! Reading is lenient towards documents written by earlier front ends: the
//! misspelled `filtefreq` key is accepted for `filterfreq`, numeric strings
//! are accepted as numbers, and unknown keys are skipped. Writing always uses
//! the canonical keys and plain numbers.

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::parameter::{Parameter, ParameterValues, PARAMETER_COUNT};

/// Name of the built-in profile that always exists and is always first.
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Keys written by older documents, mapped to their canonical parameter.
const LEGACY_KEYS: [(&str, Parameter); 1] = [("filtefreq", Parameter::FilterFreq)];

/// A named, complete set of parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub values: ParameterValues,
}

impl Profile {
    pub fn new(name: impl Into<String>, values: ParameterValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// The built-in "Default" profile with baseline values.
    pub fn baseline() -> Self {
        Self::new(DEFAULT_PROFILE_NAME, ParameterValues::default())
    }
}

fn document_key(key: &str) -> Option<Parameter> {
    Parameter::from_key(key).or_else(|| {
        LEGACY_KEYS
            .iter()
            .find(|(legacy, _)| *legacy == key)
            .map(|(_, parameter)| *parameter)
    })
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PARAMETER_COUNT + 1))?;
        map.serialize_entry("name", &self.name)?;
        for (parameter, value) in self.values.iter() {
            // Whole values are written without a fraction, as the UI produces them.
            if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                map.serialize_entry(parameter.key(), &(value as i64))?;
            } else {
                map.serialize_entry(parameter.key(), &value)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

struct ProfileVisitor;

impl<'de> Visitor<'de> for ProfileVisitor {
    type Value = Profile;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a profile object with a name and every catalog parameter")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Profile, A::Error> {
        let mut name: Option<String> = None;
        let mut values = ParameterValues::default();
        let mut seen = [false; PARAMETER_COUNT];

        while let Some(key) = map.next_key::<String>()? {
            if key == "name" {
                name = Some(map.next_value()?);
                continue;
            }
            let Some(parameter) = document_key(&key) else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };
            let value = match map.next_value::<LooseNumber>()? {
                LooseNumber::Number(n) => n,
                LooseNumber::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                    <A::Error as de::Error>::custom(format!("{} is not a number: {:?}", key, text))
                })?,
            };
            if !value.is_finite() {
                return Err(<A::Error as de::Error>::custom(format!(
                    "{} is not a finite number",
                    key
                )));
            }
            values.set(parameter, value);
            seen[parameter.index()] = true;
        }

        let name = name.ok_or_else(|| <A::Error as de::Error>::missing_field("name"))?;
        if let Some(missing) = Parameter::ALL.iter().find(|p| !seen[p.index()]) {
            return Err(de::Error::custom(format!(
                "profile \"{}\" is missing {}",
                name, missing
            )));
        }
        Ok(Profile { name, values })
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ProfileVisitor)
    }
}

/// The whole persisted profile collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub current: String,
    pub profiles: Vec<Profile>,
}

impl Default for ProfileDocument {
    /// Only the "Default" profile, selected.
    fn default() -> Self {
        Self {
            current: DEFAULT_PROFILE_NAME.to_string(),
            profiles: vec![Profile::baseline()],
        }
    }
}

impl ProfileDocument {
    /// Checks the document invariants, returning the first violation.
    ///
    /// - the first profile is named "Default"
    /// - names are unique (exact, case-sensitive)
    /// - `current` names an existing profile
    pub fn validate(&self) -> Result<(), String> {
        match self.profiles.first() {
            Some(first) if first.name == DEFAULT_PROFILE_NAME => {}
            Some(first) => {
                return Err(format!(
                    "first profile is \"{}\", expected \"{}\"",
                    first.name, DEFAULT_PROFILE_NAME
                ))
            }
            None => return Err("document has no profiles".to_string()),
        }
        for (i, profile) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(format!("duplicate profile name \"{}\"", profile.name));
            }
        }
        if self.find(&self.current).is_none() {
            return Err(format!("current profile \"{}\" does not exist", self.current));
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }
}
