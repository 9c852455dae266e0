//! Compact weekday sets for task schedules and worker availability.

use chrono::Weekday;
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyString;
use thiserror::Error;

/// All weekdays, Monday first. Iteration order for every day-indexed table.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A day label that is not an English weekday name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown weekday: {0:?}")]
pub struct DayParseError(pub String);

/// Full English name for a weekday (`chrono` only displays abbreviations).
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Set of weekdays stored as a 7-bit mask (bit 0 = Monday).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);

    #[inline]
    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn single(day: Weekday) -> Self {
        WeekdaySet(Self::bit(day))
    }

    /// Insert a day, returning `true` if it was not present.
    pub fn insert(&mut self, day: Weekday) -> bool {
        let fresh = !self.contains(day);
        self.0 |= Self::bit(day);
        fresh
    }

    #[inline]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: WeekdaySet) -> WeekdaySet {
        WeekdaySet(self.0 | other.0)
    }

    /// Days in the set, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.iter().copied().filter(move |d| self.contains(*d))
    }

    /// Full day names, Monday first.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(day_name).collect()
    }

    /// Parse day labels ("Monday", "mon", "TUESDAY", ...). Duplicates collapse.
    pub fn parse_names<I, S>(names: I) -> Result<Self, DayParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = WeekdaySet::EMPTY;
        for name in names {
            let raw = name.as_ref();
            let day = raw
                .trim()
                .parse::<Weekday>()
                .map_err(|_| DayParseError(raw.to_string()))?;
            set.insert(day);
        }
        Ok(set)
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut set = WeekdaySet::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl std::fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl<'py> FromPyObject<'py> for WeekdaySet {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        // A bare string would otherwise iterate as characters
        if ob.is_instance_of::<PyString>() {
            return Err(PyTypeError::new_err(
                "expected an iterable of day names, got a single str",
            ));
        }
        let mut names: Vec<String> = Vec::new();
        for item in ob.iter()? {
            names.push(item?.extract()?);
        }
        WeekdaySet::parse_names(&names).map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

impl IntoPy<PyObject> for WeekdaySet {
    fn into_py(self, py: Python<'_>) -> PyObject {
        self.names().into_py(py)
    }
}

impl ToPyObject for WeekdaySet {
    fn to_object(&self, py: Python<'_>) -> PyObject {
        self.names().to_object(py)
    }
}
