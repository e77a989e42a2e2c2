//! Series-level scenarios for the recurrence engine, built from parsed text
//! the way a caller holding DTSTART / RRULE / RDATE / EXDATE properties would.

mod scenarios;
