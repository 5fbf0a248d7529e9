//! Seed reference data: the BSE instruments and Botswana brokerages the demo
//! ships with. Applied when the store starts empty.

use rust_decimal::Decimal;

use crate::types::broker::Broker;
use crate::types::instrument::Instrument;

fn instrument(
    id: &str,
    symbol: &str,
    name: &str,
    sector: &str,
    current_price: Decimal,
    previous_close: Decimal,
    market_cap: i64,
    pe_ratio: Decimal,
    dividend_yield: Decimal,
) -> Instrument {
    Instrument {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        sector: sector.to_string(),
        current_price,
        previous_close,
        market_cap: Decimal::from(market_cap),
        pe_ratio,
        dividend_yield,
        is_active: true,
    }
}

pub fn bse_instruments() -> Vec<Instrument> {
    vec![
        instrument(
            "letshego",
            "LETSHEGO",
            "Letshego Holdings Limited",
            "Financials",
            Decimal::new(105, 2),
            Decimal::new(115, 2),
            2_100_000_000,
            Decimal::new(84, 1),
            Decimal::new(42, 1),
        ),
        instrument(
            "absa",
            "ABSA",
            "Absa Bank Botswana Limited",
            "Financials",
            Decimal::new(730, 2),
            Decimal::new(690, 2),
            5_200_000_000,
            Decimal::new(121, 1),
            Decimal::new(58, 1),
        ),
        instrument(
            "chobe",
            "CHOBE",
            "Chobe Holdings Limited",
            "Consumer Services",
            Decimal::new(1755, 2),
            Decimal::new(1736, 2),
            3_400_000_000,
            Decimal::new(152, 1),
            Decimal::new(31, 1),
        ),
        instrument(
            "choppies",
            "CHOPPIES",
            "Choppies Enterprises Limited",
            "Consumer Services",
            Decimal::new(70, 2),
            Decimal::new(52, 2),
            450_000_000,
            Decimal::new(185, 1),
            Decimal::new(21, 1),
        ),
        instrument(
            "engen",
            "ENGEN",
            "Engen Botswana Limited",
            "Oil & Gas",
            Decimal::new(1425, 2),
            Decimal::new(1413, 2),
            1_800_000_000,
            Decimal::new(97, 1),
            Decimal::new(62, 1),
        ),
        instrument(
            "fnb",
            "FNB",
            "First National Bank of Botswana Limited",
            "Financials",
            Decimal::new(530, 2),
            Decimal::new(511, 2),
            2_800_000_000,
            Decimal::new(113, 1),
            Decimal::new(48, 1),
        ),
    ]
}

pub fn bse_brokers() -> Vec<Broker> {
    vec![
        Broker {
            id: "stockbrokers-botswana".to_string(),
            name: "Stockbrokers Botswana".to_string(),
            description: "Established in 1989, first broker with research function".to_string(),
            commission: Decimal::new(250, 2),
            is_active: true,
        },
        Broker {
            id: "imara-capital".to_string(),
            name: "Imara Capital Securities".to_string(),
            description: "Part of Capital Group, started operations in March 2000".to_string(),
            commission: Decimal::new(275, 2),
            is_active: true,
        },
        Broker {
            id: "motswedi-securities".to_string(),
            name: "Motswedi Securities".to_string(),
            description: "Citizen-owned company serving individuals and institutions".to_string(),
            commission: Decimal::new(225, 2),
            is_active: true,
        },
    ]
}
