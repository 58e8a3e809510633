use std::cmp::Ordering;

use super::types::{Instrument, SHORTLIST_LEN};

/// Picks the fastest-growing instruments priced at or below `investable_amount`.
///
/// Instruments with equal growth keep their catalog order. An empty result means
/// nothing is affordable; it is not an error.
pub fn suggest(catalog: &[Instrument], investable_amount: f64) -> Vec<Instrument> {
    let mut affordable: Vec<&Instrument> = catalog
        .iter()
        .filter(|instrument| instrument.price <= investable_amount)
        .collect();

    // sort_by is stable, which gives the catalog-order tie-break. Growth is
    // finite (catalog-validated), and -0.0 must tie with 0.0.
    affordable.sort_by(|a, b| {
        b.monthly_growth
            .partial_cmp(&a.monthly_growth)
            .unwrap_or(Ordering::Equal)
    });

    affordable
        .into_iter()
        .take(SHORTLIST_LEN)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use proptest::collection::vec;

    fn instrument(ticker: &str, price: f64, monthly_growth: f64) -> Instrument {
        Instrument {
            company: format!("{ticker} Corp"),
            ticker: ticker.to_string(),
            price,
            monthly_growth,
        }
    }

    fn tickers(picks: &[Instrument]) -> Vec<&str> {
        picks.iter().map(|p| p.ticker.as_str()).collect()
    }

    #[test]
    fn affordable_instruments_are_ranked_by_growth() {
        let catalog = vec![
            instrument("A", 100.0, 5.0),
            instrument("B", 300.0, 8.0),
            instrument("C", 450.0, 3.0),
            instrument("D", 600.0, 9.0),
        ];

        let picks = suggest(&catalog, 500.0);
        assert_eq!(tickers(&picks), vec!["B", "A", "C"]);
    }

    #[test]
    fn nothing_affordable_yields_empty_shortlist() {
        let catalog = vec![instrument("X", 1_000.0, 10.0)];
        assert!(suggest(&catalog, 500.0).is_empty());
    }

    #[test]
    fn empty_catalog_yields_empty_shortlist() {
        assert!(suggest(&[], 10_000.0).is_empty());
    }

    #[test]
    fn price_equal_to_amount_is_affordable() {
        let catalog = vec![instrument("EQ", 500.0, 1.0)];
        assert_eq!(tickers(&suggest(&catalog, 500.0)), vec!["EQ"]);
    }

    #[test]
    fn shortlist_is_capped_at_three() {
        let catalog = vec![
            instrument("A", 10.0, 1.0),
            instrument("B", 10.0, 2.0),
            instrument("C", 10.0, 3.0),
            instrument("D", 10.0, 4.0),
            instrument("E", 10.0, 5.0),
        ];
        assert_eq!(tickers(&suggest(&catalog, 100.0)), vec!["E", "D", "C"]);
    }

    #[test]
    fn equal_growth_keeps_catalog_order() {
        let catalog = vec![
            instrument("FIRST", 10.0, 4.0),
            instrument("HIGH", 10.0, 7.0),
            instrument("SECOND", 10.0, 4.0),
            instrument("THIRD", 10.0, 4.0),
        ];
        assert_eq!(
            tickers(&suggest(&catalog, 100.0)),
            vec!["HIGH", "FIRST", "SECOND"]
        );
    }

    #[test]
    fn negative_growth_still_ranks_below_positive() {
        let catalog = vec![instrument("LOSS", 10.0, -2.5), instrument("GAIN", 10.0, 0.5)];
        assert_eq!(tickers(&suggest(&catalog, 100.0)), vec!["GAIN", "LOSS"]);
    }

    #[test]
    fn nan_or_negative_amount_selects_nothing() {
        let catalog = vec![instrument("FREE", 0.0, 1.0)];
        assert!(suggest(&catalog, f64::NAN).is_empty());
        assert!(suggest(&catalog, -1.0).is_empty());
        assert_eq!(tickers(&suggest(&catalog, 0.0)), vec!["FREE"]);
    }

    #[test]
    fn negative_zero_growth_ties_with_zero() {
        let catalog = vec![
            instrument("NEGZERO", 10.0, -0.0),
            instrument("POSZERO", 10.0, 0.0),
        ];
        assert_eq!(tickers(&suggest(&catalog, 100.0)), vec!["NEGZERO", "POSZERO"]);

        let reversed = vec![
            instrument("POSZERO", 10.0, 0.0),
            instrument("NEGZERO", 10.0, -0.0),
        ];
        assert_eq!(tickers(&suggest(&reversed, 100.0)), vec!["POSZERO", "NEGZERO"]);
    }

    #[test]
    fn catalog_is_left_untouched() {
        let catalog = vec![instrument("A", 10.0, 1.0), instrument("B", 10.0, 9.0)];
        let before = catalog.clone();
        let _ = suggest(&catalog, 100.0);
        assert_eq!(catalog, before);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_suggest_respects_budget_cap_and_order(
            rows in vec((0u32..2_000, -500i32..1_500), 0..24),
            amount in 0u32..2_000
        ) {
            let catalog: Vec<Instrument> = rows
                .iter()
                .enumerate()
                .map(|(i, (price, growth_bp))| {
                    instrument(&format!("T{i}"), *price as f64, *growth_bp as f64 / 100.0)
                })
                .collect();
            let amount = amount as f64;

            let picks = suggest(&catalog, amount);
            prop_assert!(picks.len() <= SHORTLIST_LEN);
            for pick in &picks {
                prop_assert!(pick.price <= amount);
            }
            for pair in picks.windows(2) {
                prop_assert!(pair[0].monthly_growth >= pair[1].monthly_growth);
            }

            let affordable = catalog.iter().filter(|i| i.price <= amount).count();
            prop_assert_eq!(picks.len(), affordable.min(SHORTLIST_LEN));

            prop_assert_eq!(suggest(&catalog, amount), picks);
        }
    }
}
