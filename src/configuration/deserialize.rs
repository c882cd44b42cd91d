/// Distinguishes a key that is absent (`None`) from a key explicitly set
/// to `null` (`Some(None)`). Use together with `#[serde(default)]`.
pub mod present {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

pub mod duration {
    use crate::time::timeunit::DurationUnit;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::convert::TryFrom;
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse::<DurationUnit>()
            .and_then(Duration::try_from)
            .map_err(|err| D::Error::custom(err.to_string()))
    }
}

/// Accepts either a single string or a list of strings.
pub mod string_or_list {
    use serde::{Deserialize, Deserializer};
    use serde_derive::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        })
    }
}

#[cfg(test)]
mod test {
    use serde_derive::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize, Debug)]
    struct Sensor {
        #[serde(default, with = "super::present")]
        section: Option<Option<Vec<u32>>>,
        #[serde(default, with = "super::string_or_list")]
        names: Vec<String>,
    }

    #[derive(Deserialize)]
    struct Wait {
        #[serde(with = "super::duration")]
        duration: Duration,
    }

    #[test]
    fn test_absent_and_null_are_distinct() {
        let absent: Sensor = serde_yaml::from_str("names: a").unwrap();
        let null: Sensor = serde_yaml::from_str("section: ~").unwrap();
        let list: Sensor = serde_yaml::from_str("section: [1, 2]\nnames: [a, b]").unwrap();

        assert_eq!(absent.section, None);
        assert_eq!(absent.names, vec!["a".to_owned()]);
        assert_eq!(null.section, Some(None));
        assert_eq!(list.section, Some(Some(vec![1, 2])));
        assert_eq!(list.names.len(), 2);
    }

    #[test]
    fn test_duration_from_unit_string() {
        let wait: Wait = serde_yaml::from_str("duration: 3s").unwrap();
        assert_eq!(wait.duration, Duration::from_secs(3));
        assert!(serde_yaml::from_str::<Wait>("duration: later").is_err());
        assert!(serde_yaml::from_str::<Wait>("duration: 99999999999999999999d").is_err());
        assert!(serde_yaml::from_str::<Wait>("duration: 18446744073709551615h").is_err());
    }
}
