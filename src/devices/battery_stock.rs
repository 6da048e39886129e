use super::battery::Battery;
use super::grid::Grid;
use super::types::{Direction, INFEASIBLE_COST, SocKind};

/// An ordered collection of batteries operated as one storage unit.
///
/// Charge requests go to the emptiest battery first and discharge requests to
/// the fullest, each unit capped at its own limits. Ties keep configuration
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryStock {
    batteries: Vec<Battery>,
}

impl BatteryStock {
    /// Creates a stock. An empty stock is valid and never stores anything.
    pub fn new(batteries: Vec<Battery>) -> Self {
        Self { batteries }
    }

    pub fn batteries(&self) -> &[Battery] {
        &self.batteries
    }

    pub fn is_empty(&self) -> bool {
        self.batteries.is_empty()
    }

    /// Per-battery SOC in configuration order.
    pub fn socs(&self) -> Vec<f64> {
        self.batteries.iter().map(Battery::soc).collect()
    }

    /// Distributes a charge request, lowest SOC first.
    ///
    /// # Returns
    ///
    /// Total power absorbed (kW), never more than `power_kw`.
    ///
    /// # Panics
    ///
    /// Panics if `power_kw` is negative.
    pub fn charge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        assert!(power_kw >= 0.0, "charge power must be >= 0, got {power_kw}");
        let order = self.order_by_soc(Direction::Charge);
        let mut remaining = power_kw;
        for idx in order {
            if remaining <= 0.0 {
                break;
            }
            remaining -= self.batteries[idx].charge(remaining, dt_hours);
        }
        power_kw - remaining.max(0.0)
    }

    /// Distributes a discharge request, highest SOC first.
    ///
    /// # Returns
    ///
    /// Total power supplied (kW), never more than `power_kw`.
    ///
    /// # Panics
    ///
    /// Panics if `power_kw` is negative.
    pub fn discharge(&mut self, power_kw: f64, dt_hours: f64) -> f64 {
        assert!(power_kw >= 0.0, "discharge power must be >= 0, got {power_kw}");
        let order = self.order_by_soc(Direction::Discharge);
        let mut remaining = power_kw;
        for idx in order {
            if remaining <= 0.0 {
                break;
            }
            remaining -= self.batteries[idx].discharge(remaining, dt_hours);
        }
        power_kw - remaining.max(0.0)
    }

    fn order_by_soc(&self, direction: Direction) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.batteries.len()).collect();
        // sort_by is stable, so equal SOCs keep configuration order
        match direction {
            Direction::Charge => order.sort_by(|&a, &b| {
                self.batteries[a]
                    .soc()
                    .total_cmp(&self.batteries[b].soc())
            }),
            Direction::Discharge => order.sort_by(|&a, &b| {
                self.batteries[b]
                    .soc()
                    .total_cmp(&self.batteries[a].soc())
            }),
        }
        order
    }

    /// Capacity-weighted mean of the requested SOC figure (0 when empty).
    pub fn soc(&self, kind: SocKind) -> f64 {
        let capacity = self.capacity();
        if capacity <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .batteries
            .iter()
            .map(|b| {
                let value = match kind {
                    SocKind::Current => b.soc(),
                    SocKind::Min => b.soc_min,
                    SocKind::Max => b.soc_max,
                };
                value * b.capacity_kwh
            })
            .sum();
        weighted / capacity
    }

    /// Whether every battery is at its upper bound.
    pub fn is_full(&self) -> bool {
        self.soc(SocKind::Current) >= self.soc(SocKind::Max)
    }

    /// Largest power the stock can absorb or supply over one step.
    ///
    /// The energy limit (headroom, or usable energy after losses) is combined
    /// with the sum of the power ratings of the batteries not yet at the
    /// relevant bound.
    pub fn max_power(&self, dt_hours: f64, direction: Direction) -> f64 {
        let (energy_kwh, rating_kw) = match direction {
            Direction::Charge => self.batteries.iter().fold((0.0, 0.0), |(e, p), b| {
                let p = if b.soc() < b.soc_max { p + b.max_charge_kw } else { p };
                (e + b.headroom_kwh(), p)
            }),
            Direction::Discharge => self.batteries.iter().fold((0.0, 0.0), |(e, p), b| {
                let p = if b.soc() > b.soc_min {
                    p + b.max_discharge_kw
                } else {
                    p
                };
                (e + b.usable_energy_kwh(), p)
            }),
        };
        (energy_kwh / dt_hours).min(rating_kw)
    }

    /// Total capacity (kWh).
    pub fn capacity(&self) -> f64 {
        self.batteries.iter().map(|b| b.capacity_kwh).sum()
    }

    /// Capacity-weighted discharge efficiency (0 when empty).
    pub fn mean_efficiency(&self) -> f64 {
        let capacity = self.capacity();
        if capacity <= 0.0 {
            return 0.0;
        }
        self.batteries
            .iter()
            .map(|b| b.eta * b.capacity_kwh)
            .sum::<f64>()
            / capacity
    }

    pub fn replacement_cost(&self) -> f64 {
        self.batteries.iter().map(|b| b.replacement_cost).sum()
    }

    pub fn maintenance_cost(&self) -> f64 {
        self.batteries.iter().map(|b| b.maintenance_cost).sum()
    }

    /// Decision cost of charging the stock at `step`.
    ///
    /// Zero when the stock is inactive or full. With a look-ahead horizon of
    /// `h` hours, a grid outage anywhere in the next `floor(h / dt)` steps
    /// (current step included) makes charging urgent: the sentinel cost is
    /// returned so that storing always wins over selling. Otherwise charging is
    /// valued at the peak-tier buy price.
    pub fn charge_cost(
        &self,
        grid: &Grid,
        step: usize,
        dt_hours: f64,
        active: bool,
        lookahead_h: Option<f64>,
    ) -> f64 {
        if !active || self.is_full() {
            return 0.0;
        }
        let horizon = lookahead_h.map_or(0, |h| (h / dt_hours).floor() as usize);
        if grid.outage_ahead(step, horizon.saturating_add(1)) {
            INFEASIBLE_COST
        } else {
            grid.peak_purchase_price()
        }
    }

    /// Decision cost of supplying `power_kw` from the stock for one step.
    ///
    /// Combines the peak price of the energy stored, wear (replacement cost
    /// over lifetime throughput) and maintenance. Returns the sentinel cost
    /// when the request exceeds what the stock can currently deliver.
    pub fn discharge_cost(&self, grid: &Grid, power_kw: f64, dt_hours: f64, active: bool) -> f64 {
        if !active {
            return f64::INFINITY;
        }
        let window: f64 = self.batteries.iter().map(Battery::window_kwh).sum();
        let lifetime: f64 = self
            .batteries
            .iter()
            .map(|b| b.window_kwh() * b.lifetime_kwh)
            .sum();
        if window <= 0.0 || lifetime <= 0.0 {
            return INFEASIBLE_COST;
        }
        if power_kw > self.max_power(dt_hours, Direction::Discharge) {
            return INFEASIBLE_COST;
        }
        grid.peak_purchase_price() / window * self.capacity()
            + self.replacement_cost() / lifetime
            + self.maintenance_cost()
    }
}
