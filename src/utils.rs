// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Local, NaiveDate};

/// Period key for the month containing `date`: the first calendar day.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Period key for the current wall-clock month, taken at call time.
pub fn current_month() -> NaiveDate {
    month_start(Local::now().date_naive())
}
