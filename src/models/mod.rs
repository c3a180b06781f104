use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

pub mod attendance;
pub mod dashboard;
pub mod member;
pub mod package;
pub mod payment;
pub mod photo;

pub const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");
pub const TIME_FORMAT: &[FormatItem<'_>] = format_description!("[hour]:[minute]");
const TIME_WITH_SECONDS_FORMAT: &[FormatItem<'_>] =
    format_description!("[hour]:[minute]:[second]");

/// A calendar date, sent over GraphQL as `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DateScalar(pub Date);

#[Scalar(name = "Date")]
impl ScalarType for DateScalar {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(date_str) = &value {
            if let Ok(date) = Date::parse(date_str, DATE_FORMAT) {
                return Ok(DateScalar(date));
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        self.0
            .format(DATE_FORMAT)
            .map(Value::String)
            .unwrap_or_default()
    }
}

impl From<Date> for DateScalar {
    fn from(date: Date) -> Self {
        DateScalar(date)
    }
}

/// A time of day, sent over GraphQL as `HH:MM` (seconds are accepted on input).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TimeScalar(pub Time);

#[Scalar(name = "Time")]
impl ScalarType for TimeScalar {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(time_str) = &value {
            if let Ok(time) = Time::parse(time_str, TIME_WITH_SECONDS_FORMAT)
                .or_else(|_| Time::parse(time_str, TIME_FORMAT))
            {
                return Ok(TimeScalar(time));
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        self.0
            .format(TIME_FORMAT)
            .map(Value::String)
            .unwrap_or_default()
    }
}

impl From<Time> for TimeScalar {
    fn from(time: Time) -> Self {
        TimeScalar(time)
    }
}

/// A point in time, sent over GraphQL as RFC 3339.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DateTimeScalar(pub OffsetDateTime);

#[Scalar(name = "DateTime")]
impl ScalarType for DateTimeScalar {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(date_str) = &value {
            if let Ok(date) = OffsetDateTime::parse(date_str, &Rfc3339) {
                return Ok(DateTimeScalar(date));
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        self.0
            .format(&Rfc3339)
            .map(Value::String)
            .unwrap_or_default()
    }
}

impl From<OffsetDateTime> for DateTimeScalar {
    fn from(time: OffsetDateTime) -> Self {
        DateTimeScalar(time)
    }
}
