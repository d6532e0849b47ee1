use crate::parser::ParseError;

/// Running first/second dose totals across the vaccine-brand entries of one payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShotTotals {
    pub first: i32,
    pub second: i32,
}

impl ShotTotals {
    pub fn add_first(&mut self, count: i32) -> Result<(), ParseError> {
        self.first = checked_sum(self.first, count, "firstShot")?;
        Ok(())
    }

    pub fn add_second(&mut self, count: i32) -> Result<(), ParseError> {
        self.second = checked_sum(self.second, count, "secondShot")?;
        Ok(())
    }
}

fn checked_sum(total: i32, count: i32, field: &'static str) -> Result<i32, ParseError> {
    total
        .checked_add(count)
        .ok_or(ParseError::ShotCountOverflow { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_each_dose_independently() {
        let mut totals = ShotTotals::default();
        totals.add_first(10).expect("sum fits");
        totals.add_second(7).expect("sum fits");
        totals.add_first(3).expect("sum fits");

        assert_eq!(totals, ShotTotals { first: 13, second: 7 });
    }

    #[test]
    fn reports_overflow_instead_of_wrapping() {
        let mut totals = ShotTotals {
            first: i32::MAX,
            second: 0,
        };

        let error = totals.add_first(1).expect_err("overflow should fail");
        assert!(matches!(
            error,
            ParseError::ShotCountOverflow { field: "firstShot" }
        ));
        assert_eq!(totals.first, i32::MAX);
    }
}
