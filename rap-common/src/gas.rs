use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Fee parameters attached to a transaction request.
///
/// Different EVM networks use different gas pricing models:
/// - Most modern chains use EIP-1559 (max fee + priority fee model)
/// - Legacy chains (e.g., BSC) use a simple gas price
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GasPrice {
    /// Legacy gas pricing model with a single gas price value.
    Legacy {
        /// Gas price in wei
        #[serde_as(as = "DisplayFromStr")]
        gas_price: u128,
    },
    /// EIP-1559 gas pricing model.
    Eip1559 {
        /// Maximum total fee per gas in wei the sender is willing to pay
        #[serde_as(as = "DisplayFromStr")]
        max_fee_per_gas: u128,
        /// Maximum priority fee (tip) per gas in wei, paid to validators
        #[serde_as(as = "DisplayFromStr")]
        max_priority_fee_per_gas: u128,
    },
}

impl GasPrice {
    /// Upper bound of the price paid per unit of gas.
    ///
    /// For Legacy: returns the gas_price
    /// For EIP-1559: returns max_fee_per_gas
    pub fn max_price_per_gas(&self) -> u128 {
        match self {
            GasPrice::Legacy { gas_price } => *gas_price,
            GasPrice::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Worst-case fee in wei for a transaction with the given gas limit.
    pub fn max_fee(&self, gas_limit: u64) -> u128 {
        self.max_price_per_gas()
            .saturating_mul(gas_limit as u128)
    }

    /// Raises every fee component to at least the one in `floor`.
    ///
    /// A floor priced under the other model leaves the price unchanged.
    pub fn at_least(&self, floor: &GasPrice) -> GasPrice {
        match (self, floor) {
            (GasPrice::Legacy { gas_price }, GasPrice::Legacy { gas_price: floor }) => {
                GasPrice::Legacy { gas_price: (*gas_price).max(*floor) }
            }
            (
                GasPrice::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas },
                GasPrice::Eip1559 {
                    max_fee_per_gas: floor_fee,
                    max_priority_fee_per_gas: floor_priority,
                },
            ) => GasPrice::Eip1559 {
                max_fee_per_gas: (*max_fee_per_gas).max(*floor_fee),
                max_priority_fee_per_gas: (*max_priority_fee_per_gas).max(*floor_priority),
            },
            _ => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_max_price() {
        let gas_price = 50_000_000_000u128; // 50 Gwei
        let legacy = GasPrice::Legacy { gas_price };
        assert_eq!(legacy.max_price_per_gas(), gas_price);
    }

    #[test]
    fn test_eip1559_max_price_ignores_tip() {
        let eip1559 = GasPrice::Eip1559 {
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        };

        assert_eq!(eip1559.max_price_per_gas(), 30_000_000_000);
        assert_eq!(eip1559.max_fee(21_000), 630_000_000_000_000);
    }

    #[test]
    fn test_at_least_raises_each_component() {
        let selected = GasPrice::Eip1559 {
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 3_000_000_000,
        };
        let fast = GasPrice::Eip1559 {
            max_fee_per_gas: 40_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        };

        assert_eq!(
            selected.at_least(&fast),
            GasPrice::Eip1559 {
                max_fee_per_gas: 40_000_000_000,
                max_priority_fee_per_gas: 3_000_000_000,
            }
        );
    }

    #[test]
    fn test_at_least_ignores_other_model() {
        let legacy = GasPrice::Legacy { gas_price: 5_000_000_000 };
        let fast = GasPrice::Eip1559 {
            max_fee_per_gas: 40_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        };

        assert_eq!(legacy.at_least(&fast), legacy);
        assert_eq!(
            legacy.at_least(&GasPrice::Legacy { gas_price: 7_000_000_000 }),
            GasPrice::Legacy { gas_price: 7_000_000_000 }
        );
    }

    #[test]
    fn test_serialize_legacy_gas_price() {
        let gas_price = GasPrice::Legacy { gas_price: 50_000_000_000 };

        let json = serde_json::to_string(&gas_price).unwrap();
        assert_eq!(json, r#"{"type":"legacy","gas_price":"50000000000"}"#);
    }

    #[test]
    fn test_deserialize_eip1559_gas_price() {
        let json = r#"{"type":"eip1559","max_fee_per_gas":"30000000000","max_priority_fee_per_gas":"2000000000"}"#;
        let gas_price: GasPrice = serde_json::from_str(json).unwrap();

        assert_eq!(
            gas_price,
            GasPrice::Eip1559 {
                max_fee_per_gas: 30_000_000_000,
                max_priority_fee_per_gas: 2_000_000_000,
            }
        );
    }

    #[test]
    fn test_deserialize_invalid_json() {
        let invalid_json = r#"{"type":"legacy","gas_price":"not_a_number"}"#;
        let result: Result<GasPrice, _> = serde_json::from_str(invalid_json);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_missing_field() {
        let invalid_json = r#"{"type":"eip1559","max_fee_per_gas":"30000000000"}"#;
        let result: Result<GasPrice, _> = serde_json::from_str(invalid_json);
        assert!(result.is_err());
    }
}
