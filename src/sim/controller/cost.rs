use tracing::trace;

use super::Controller;
use crate::devices::Direction;
use crate::sim::microgrid::Microgrid;
use crate::sim::types::{Branch, CostSignals, StepDispatch, StepInput};

/// Cost-comparison dispatch.
///
/// Every step each device quotes a decision cost per kWh and the cheapest
/// option is used. Costs are not accounting figures: sentinel and infinite
/// values steer the choice away from unavailable or undesirable options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostController {
    charge_using_grid_cost: f64,
    lookahead_h: Option<f64>,
}

impl CostController {
    /// Creates a controller.
    ///
    /// # Arguments
    ///
    /// * `charge_using_grid_cost` - Batteries charge from the grid while the
    ///   purchase price is below this (0 disables)
    /// * `lookahead_h` - Grid availability horizon (h) for the charge cost
    pub fn new(charge_using_grid_cost: f64, lookahead_h: Option<f64>) -> Self {
        Self {
            charge_using_grid_cost,
            lookahead_h,
        }
    }

    /// Stores `excess` or sells it, whichever is worth more.
    fn place_excess(
        excess: f64,
        step: usize,
        costs: &CostSignals,
        mg: &mut Microgrid,
    ) -> (f64, f64, bool) {
        if costs.battery_charge < costs.grid_sale {
            return (-excess, 0.0, true);
        }
        let charged = if mg.active.batteries {
            mg.batteries.charge(excess, mg.dt_hours)
        } else {
            0.0
        };
        let grid_kw = if mg.grid_up(step) {
            charged - excess
        } else {
            0.0
        };
        (grid_kw, -charged, false)
    }
}

impl Controller for CostController {
    fn dispatch(&mut self, input: &StepInput, mg: &mut Microgrid) -> StepDispatch {
        let step = input.step;
        let dt = mg.dt_hours;
        let net = input.net_kw();
        let grid_up = mg.grid_up(step);

        let mut costs = CostSignals {
            grid_sale: if grid_up {
                mg.grid.sale_cost(input.time, step)
            } else {
                0.0
            },
            grid_purchase: f64::INFINITY,
            battery_charge: mg
                .batteries
                .charge_cost(&mg.grid, step, dt, mg.active.batteries, self.lookahead_h),
            battery_discharge: f64::INFINITY,
            diesel_use: f64::INFINITY,
        };
        let mut out = StepDispatch::idle(input.load_kw, Branch::Balanced);

        if net == 0.0 {
            mg.diesel.stop();
        } else if net > 0.0 {
            mg.diesel.stop();
            let (grid_kw, battery_kw, sold) = Self::place_excess(net, step, &costs, mg);
            out.grid_kw = grid_kw;
            out.battery_kw = battery_kw;
            out.branch = if sold {
                Branch::SellSurplus
            } else {
                Branch::ChargeSurplus
            };
        } else {
            let deficit = -net;
            let trial = mg.diesel.run(deficit, dt, mg.active.diesel);
            costs.grid_purchase = if grid_up {
                mg.grid.purchase_cost(input.time, step)
            } else {
                f64::INFINITY
            };
            costs.battery_discharge =
                mg.batteries
                    .discharge_cost(&mg.grid, deficit, dt, mg.active.batteries);
            costs.diesel_use = mg.diesel.use_cost(&trial, deficit, mg.active.diesel);

            if costs.grid_purchase < costs.battery_discharge
                && costs.grid_purchase < costs.diesel_use
            {
                mg.diesel.stop();
                out.grid_kw = deficit;
                out.branch = Branch::GridSupply;
                if costs.grid_purchase < self.charge_using_grid_cost && mg.active.batteries {
                    let max_charge = mg.batteries.max_power(dt, Direction::Charge);
                    let charged = mg.batteries.charge(max_charge, dt);
                    out.grid_kw += charged;
                    out.battery_kw = -charged;
                    out.branch = Branch::GridSupplyCharging;
                }
            } else if costs.battery_discharge < costs.diesel_use {
                mg.diesel.stop();
                let discharged = if mg.active.batteries {
                    mg.batteries.discharge(deficit, dt)
                } else {
                    0.0
                };
                out.battery_kw = discharged;
                out.branch = Branch::BatterySupply;
                if grid_up {
                    out.grid_kw = deficit - discharged;
                } else {
                    out.load_served_kw = input.green_kw + discharged;
                }
            } else {
                mg.diesel.commit(&trial, dt);
                let delivered = trial.power_kw;
                out.diesel_kw = delivered;
                if deficit < delivered {
                    let (grid_kw, battery_kw, sold) =
                        Self::place_excess(delivered - deficit, step, &costs, mg);
                    out.grid_kw = grid_kw;
                    out.battery_kw = battery_kw;
                    out.branch = if sold {
                        Branch::DieselSellExcess
                    } else {
                        Branch::DieselChargeExcess
                    };
                } else if costs.grid_purchase < costs.battery_discharge {
                    out.grid_kw = deficit - delivered;
                    out.branch = Branch::DieselGridTopUp;
                } else {
                    let discharged = if mg.active.batteries {
                        mg.batteries.discharge(deficit - delivered, dt)
                    } else {
                        0.0
                    };
                    out.battery_kw = discharged;
                    out.branch = Branch::DieselBatteryTopUp;
                    if grid_up {
                        out.grid_kw = deficit - delivered - discharged;
                    } else {
                        out.load_served_kw = input.green_kw + delivered + discharged;
                    }
                }
            }
        }

        trace!(step, branch = %out.branch, ?costs, "cost dispatch");
        out.costs = Some(costs);
        out
    }

    fn name(&self) -> &'static str {
        "cost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{ActiveDevices, INFEASIBLE_COST, SocKind};
    use crate::sim::controller::test_support::{input, microgrid};

    fn ctrl() -> CostController {
        CostController::new(0.0, None)
    }

    #[test]
    fn balanced_step_does_nothing() {
        let mut mg = microgrid(0.5, vec![true; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 100.0, 100.0), &mut mg);
        assert_eq!(out.branch, Branch::Balanced);
        assert_eq!(out.grid_kw, 0.0);
        let costs = out.costs.unwrap();
        assert!(costs.grid_purchase.is_infinite());
        assert!(costs.diesel_use.is_infinite());
    }

    #[test]
    fn surplus_charges_when_storage_worth_more_than_sale() {
        // charge cost is the peak buy price, above any sell price
        let mut mg = microgrid(0.5, vec![true; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 50.0, 150.0), &mut mg);
        assert_eq!(out.branch, Branch::ChargeSurplus);
        assert_eq!(out.battery_kw, -100.0);
        assert_eq!(out.grid_kw, 0.0);
    }

    #[test]
    fn surplus_sold_when_batteries_full() {
        let mut mg = microgrid(0.9, vec![true; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 50.0, 150.0), &mut mg);
        assert_eq!(out.branch, Branch::SellSurplus);
        assert_eq!(out.grid_kw, -100.0);
    }

    #[test]
    fn surplus_beyond_charge_limit_sold() {
        let mut mg = microgrid(0.5, vec![true; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 0.0, 300.0), &mut mg);
        assert_eq!(out.branch, Branch::ChargeSurplus);
        assert_eq!(out.battery_kw, -200.0);
        assert_eq!(out.grid_kw, -100.0);
    }

    #[test]
    fn grid_cheapest_covers_deficit() {
        let mut mg = microgrid(0.5, vec![true; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 150.0, 50.0), &mut mg);
        assert_eq!(out.branch, Branch::GridSupply);
        assert_eq!(out.grid_kw, 100.0);
        let costs = out.costs.unwrap();
        assert!(costs.grid_purchase < costs.battery_discharge);
        assert!(costs.grid_purchase < costs.diesel_use);
    }

    #[test]
    fn cheap_grid_charges_batteries() {
        let mut mg = microgrid(0.5, vec![true; 4], ActiveDevices::default());
        let mut c = CostController::new(1.0, None);
        let out = c.dispatch(&input(0, 150.0, 50.0), &mut mg);
        assert_eq!(out.branch, Branch::GridSupplyCharging);
        assert_eq!(out.battery_kw, -200.0);
        assert_eq!(out.grid_kw, 300.0);
    }

    #[test]
    fn batteries_cover_deficit_when_islanded() {
        let mut mg = microgrid(0.5, vec![false; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 150.0, 50.0), &mut mg);
        assert_eq!(out.branch, Branch::BatterySupply);
        assert_eq!(out.battery_kw, 100.0);
        assert_eq!(out.load_served_kw, 150.0);
    }

    #[test]
    fn generator_runs_when_batteries_cannot_cover() {
        let mut mg = microgrid(0.5, vec![false; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 250.0, 50.0), &mut mg);
        let costs = out.costs.unwrap();
        assert_eq!(costs.battery_discharge, INFEASIBLE_COST);
        assert_eq!(out.diesel_kw, 200.0);
        assert_eq!(out.branch, Branch::DieselBatteryTopUp);
        assert_eq!(out.battery_kw, 0.0);
        assert_eq!(out.load_served_kw, 250.0);
        assert!(mg.diesel.fuel_rate() < 1.0);
    }

    #[test]
    fn generator_minimum_output_excess_is_stored() {
        // 20 kW deficit below the 50 kW minimum; batteries too small to help
        let mut mg = microgrid(0.1, vec![false; 4], ActiveDevices::default());
        let out = ctrl().dispatch(&input(0, 20.0, 0.0), &mut mg);
        assert_eq!(out.diesel_kw, 50.0);
        assert_eq!(out.branch, Branch::DieselChargeExcess);
        assert_eq!(out.battery_kw, -30.0);
        assert!(mg.batteries.soc(SocKind::Current) > 0.1);
    }

    #[test]
    fn disabled_devices_quote_no_cost() {
        let active = ActiveDevices {
            grid: false,
            batteries: false,
            diesel: false,
        };
        let mut mg = microgrid(0.5, vec![true; 4], active);
        let out = ctrl().dispatch(&input(0, 150.0, 50.0), &mut mg);
        let costs = out.costs.unwrap();
        assert_eq!(costs.grid_sale, 0.0);
        assert_eq!(costs.battery_charge, 0.0);
        assert!(costs.grid_purchase.is_infinite());
        assert!(costs.battery_discharge.is_infinite());
        assert!(costs.diesel_use.is_infinite());
        assert_eq!(out.grid_kw, 0.0);
        assert_eq!(out.battery_kw, 0.0);
        assert_eq!(out.diesel_kw, 0.0);
        assert_eq!(out.load_served_kw, 50.0);
    }
}
