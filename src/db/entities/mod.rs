pub mod invite_tracking;
pub mod onboarding_analytics;
pub mod onboarding_progress;
pub mod staff_invites;
pub mod vip_requests;

/// Readers for rows from older backups. SQLite column affinity let those
/// carry IDs as text, flags as `0`/`1` and `null` in most columns.
pub mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Text(String),
    }

    impl Id {
        fn parse<E: serde::de::Error>(self) -> Result<i64, E> {
            match self {
                Id::Int(id) => Ok(id),
                Id::Text(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("invalid id `{raw}`"))),
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    /// Integer or numeric string.
    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Id::deserialize(d)?.parse()
    }

    /// Like [`id`], with `null` read as `0` (no such user).
    pub fn id_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Option::<Id>::deserialize(d)? {
            Some(id) => id.parse(),
            None => Ok(0),
        }
    }

    pub fn option_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<Id>::deserialize(d)? {
            Some(Id::Text(raw)) if raw.trim().is_empty() => Ok(None),
            Some(id) => id.parse().map(Some),
            None => Ok(None),
        }
    }

    /// `true`/`false`, `1`/`0` or their string forms. `null` is `false`.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Option::<Flag>::deserialize(d)? {
            None => Ok(false),
            Some(Flag::Bool(flag)) => Ok(flag),
            Some(Flag::Int(n)) => Ok(n != 0),
            Some(Flag::Text(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "" | "0" | "false" => Ok(false),
                _ => Err(D::Error::custom(format!("invalid flag `{raw}`"))),
            },
        }
    }

    /// `null` reads as the type's default.
    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[derive(Debug, Deserialize)]
        struct Row {
            #[serde(deserialize_with = "id")]
            user_id: i64,
            #[serde(default, deserialize_with = "id_or_zero")]
            inviter_id: i64,
            #[serde(default, deserialize_with = "option_id")]
            staff_id: Option<i64>,
            #[serde(default, deserialize_with = "flag")]
            completed: bool,
            #[serde(default, deserialize_with = "or_default")]
            username: String,
        }

        fn row(raw: &str) -> Result<Row, serde_json::Error> {
            serde_json::from_str(raw)
        }

        #[test]
        fn test_text_ids_and_integer_flags() {
            let r = row(r#"{"user_id": "123456789012345678", "inviter_id": null,
                "staff_id": "", "completed": 1, "username": null}"#)
            .unwrap();
            assert_eq!(r.user_id, 123456789012345678);
            assert_eq!(r.inviter_id, 0);
            assert_eq!(r.staff_id, None);
            assert!(r.completed);
            assert_eq!(r.username, "");
        }

        #[test]
        fn test_current_shapes_still_read() {
            let r = row(r#"{"user_id": 7, "inviter_id": 9, "staff_id": 9,
                "completed": false, "username": "member7"}"#)
            .unwrap();
            assert_eq!((r.user_id, r.inviter_id, r.staff_id), (7, 9, Some(9)));
            assert!(!r.completed);
            assert_eq!(row(r#"{"user_id": 7}"#).unwrap().username, "");
        }

        #[test]
        fn test_garbage_is_rejected() {
            assert!(row(r#"{"user_id": "seven"}"#).is_err());
            assert!(row(r#"{"user_id": null}"#).is_err());
            assert!(row(r#"{"user_id": 1, "completed": "maybe"}"#).is_err());
        }
    }
}

/// Serde helpers for timestamps shared by the backup snapshot format.
///
/// Writes RFC 3339. Reads RFC 3339 as well as the naive
/// `YYYY-MM-DD HH:MM:SS[.ffffff]` form that older backups were produced with.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp `{raw}`"))
                }),
                None => Ok(None),
            }
        }
    }

}
