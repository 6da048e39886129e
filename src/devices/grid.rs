use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ensure};

/// Time-of-use price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TariffTier {
    OffPeak = 1,
    Standard = 2,
    Peak = 3,
}

impl TariffTier {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::OffPeak),
            2 => Some(Self::Standard),
            3 => Some(Self::Peak),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize - 1
    }
}

/// Buy and sell price of one tier (currency/kWh).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierPrice {
    pub buy: f64,
    pub sell: f64,
}

/// Tariff prices plus the 24 x 12 schedule assigning a tier to every
/// (hour-of-day, month) pair.
///
/// `schedule[hour][month - 1]` holds the tier code (1 off-peak, 2 standard,
/// 3 peak).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffTable {
    /// Prices indexed by tier: off-peak, standard, peak.
    pub prices: [TierPrice; 3],
    pub schedule: [[u8; 12]; 24],
}

impl Default for TariffTable {
    fn default() -> Self {
        // Nights off-peak, days standard, winter evenings peak.
        let mut schedule = [[2u8; 12]; 24];
        for (hour, row) in schedule.iter_mut().enumerate() {
            for (month_idx, tier) in row.iter_mut().enumerate() {
                let month = month_idx + 1;
                let winter = month <= 3 || month >= 11;
                *tier = if !(6..22).contains(&hour) {
                    1
                } else if winter && (17..20).contains(&hour) {
                    3
                } else {
                    2
                };
            }
        }
        Self {
            prices: [
                TierPrice {
                    buy: 0.12,
                    sell: 0.05,
                },
                TierPrice {
                    buy: 0.18,
                    sell: 0.07,
                },
                TierPrice {
                    buy: 0.27,
                    sell: 0.10,
                },
            ],
            schedule,
        }
    }
}

impl TariffTable {
    /// Checks prices and schedule codes.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if a price is negative, buy prices decrease with
    /// the tier, or a schedule entry is not 1, 2 or 3.
    pub fn check(&self) -> Result<(), ModelError> {
        for price in &self.prices {
            ensure(price.buy >= 0.0, "tariff", "buy", ">= 0", price.buy)?;
            ensure(price.sell >= 0.0, "tariff", "sell", ">= 0", price.sell)?;
        }
        if self.prices.windows(2).any(|w| w[1].buy < w[0].buy) {
            return Err(ModelError::Ordering {
                device: "tariff",
                expected: "buy prices non-decreasing with tier",
                found: format!(
                    "{}, {}, {}",
                    self.prices[0].buy, self.prices[1].buy, self.prices[2].buy
                ),
            });
        }
        for (hour, row) in self.schedule.iter().enumerate() {
            for (month_idx, &tier) in row.iter().enumerate() {
                if TariffTier::from_code(tier).is_none() {
                    return Err(ModelError::UnknownTier {
                        hour,
                        month: month_idx + 1,
                        tier,
                    });
                }
            }
        }
        Ok(())
    }

    /// Tier scheduled at the hour and month of `time`.
    pub fn tier_at(&self, time: NaiveDateTime) -> TariffTier {
        let code = self.schedule[time.hour() as usize][time.month0() as usize];
        // Codes are checked when the grid is built.
        TariffTier::from_code(code).unwrap_or(TariffTier::Peak)
    }

    pub fn price(&self, tier: TariffTier) -> TierPrice {
        self.prices[tier.index()]
    }
}

/// Utility grid connection: an exogenous availability signal and a tariff.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    availability: Vec<bool>,
    tariff: TariffTable,
}

impl Grid {
    /// Creates a grid from one availability flag per time step.
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` if the tariff table is invalid.
    pub fn new(availability: Vec<bool>, tariff: TariffTable) -> Result<Self, ModelError> {
        tariff.check()?;
        Ok(Self {
            availability,
            tariff,
        })
    }

    /// A grid that is never available, used when the grid is disabled.
    pub fn disconnected(steps: usize) -> Self {
        Self {
            availability: vec![false; steps],
            tariff: TariffTable::default(),
        }
    }

    pub fn tariff(&self) -> &TariffTable {
        &self.tariff
    }

    pub fn availability(&self) -> &[bool] {
        &self.availability
    }

    /// Whether the grid is connected at `step`. Steps past the end are down.
    pub fn is_available(&self, step: usize) -> bool {
        self.availability.get(step).copied().unwrap_or(false)
    }

    /// Whether an outage occurs anywhere in `[step, step + steps)`.
    ///
    /// The availability series is treated as cyclic past its end, so windows
    /// longer than the series are capped at one full period.
    pub fn outage_ahead(&self, step: usize, steps: usize) -> bool {
        let n = self.availability.len();
        if n == 0 {
            return steps > 0;
        }
        let start = step % n;
        (start..start + steps.min(n)).any(|i| !self.availability[i % n])
    }

    /// Revenue for selling one kWh at `time` (0 when disconnected).
    pub fn sale_cost(&self, time: NaiveDateTime, step: usize) -> f64 {
        if !self.is_available(step) {
            return 0.0;
        }
        self.tariff.price(self.tariff.tier_at(time)).sell
    }

    /// Cost of buying one kWh at `time` (+inf when disconnected).
    pub fn purchase_cost(&self, time: NaiveDateTime, step: usize) -> f64 {
        if !self.is_available(step) {
            return f64::INFINITY;
        }
        self.tariff.price(self.tariff.tier_at(time)).buy
    }

    /// Buy price of the peak tier.
    pub fn peak_purchase_price(&self) -> f64 {
        self.tariff.price(TariffTier::Peak).buy
    }
}
