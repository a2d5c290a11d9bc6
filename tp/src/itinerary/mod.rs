//! Follow-up questions about a generated itinerary

mod day_resolver;

pub use day_resolver::{
    DateSource, DayResolution, YearSource, find_month_day, resolve_day_reference, resolve_year,
};
