use crate::config::ParameterSet;
use crate::error::SimulationDivergedError;
use crate::infection::InfectionMatrices;
use crate::model::{Compartment, DrawnRates, Interventions, window_active};
use crate::ode::{Rk4Workspace, first_non_finite, rk4_step};

/// Position of every cell in the flat state vector.
///
/// Compartment-major: `[S_0..S_n, E_0..E_n, ..., U_0..U_n]`, followed by two
/// accumulator blocks (cumulative S->E and E->I flow) that are not part of
/// the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    pub num_bands: usize,
}

impl StateLayout {
    pub fn new(num_bands: usize) -> Self {
        Self { num_bands }
    }

    #[inline]
    pub fn idx(&self, compartment: Compartment, band: usize) -> usize {
        compartment.index() * self.num_bands + band
    }

    #[inline]
    pub fn cumulative_infections(&self, band: usize) -> usize {
        Compartment::COUNT * self.num_bands + band
    }

    #[inline]
    pub fn cumulative_symptomatic(&self, band: usize) -> usize {
        (Compartment::COUNT + 1) * self.num_bands + band
    }

    /// Cells holding population
    pub fn population_len(&self) -> usize {
        Compartment::COUNT * self.num_bands
    }

    pub fn len(&self) -> usize {
        (Compartment::COUNT + 2) * self.num_bands
    }

    pub fn is_empty(&self) -> bool {
        self.num_bands == 0
    }
}

/// Right-hand side of the compartment system for one drawn rate vector
#[derive(Debug, Clone)]
pub struct Dynamics<'a> {
    pub layout: StateLayout,
    pub rates: DrawnRates,
    infection: &'a InfectionMatrices,
    interventions: &'a Interventions,
    p_hospitalised: Vec<f64>,
    p_critical: Vec<f64>,
    quarantine_rate: f64,
    death_prob_with_icu: f64,
    asymptomatic_infectiousness: f64,
    asymptomatic_proportion: f64,
    /// Death rate of critical patients without ICU care
    untreated_death_rate: f64,
    /// First band removed by high-risk removal (oldest bands are last)
    high_risk_from: usize,
}

impl<'a> Dynamics<'a> {
    pub fn new(params: &'a ParameterSet, rates: DrawnRates) -> Self {
        let bands = &params.population.bands;
        let num_bands = bands.len();
        let d = &params.disease;
        let removed = params.control.interventions.remove_high_risk.n_categories;
        Self {
            layout: StateLayout::new(num_bands),
            rates,
            infection: &params.infection,
            interventions: &params.control.interventions,
            p_hospitalised: bands.iter().map(|b| b.p_hospitalised).collect(),
            p_critical: bands.iter().map(|b| b.p_critical).collect(),
            quarantine_rate: d.quarantine.rate,
            death_prob_with_icu: d.death_prob_with_icu,
            asymptomatic_infectiousness: d.asymptomatic_infectiousness,
            asymptomatic_proportion: d.asymptomatic_proportion,
            untreated_death_rate: rates.death_rate.max(rates.death_rate_with_icu),
            high_risk_from: num_bands.saturating_sub(removed),
        }
    }

    /// State at t = 0: the initially infected are exposed, everyone else susceptible
    pub fn initial_state(&self, params: &ParameterSet) -> Vec<f64> {
        let layout = self.layout;
        let mut y = vec![0.0; layout.len()];
        let seeded = params.population.initial_infected / params.population.total_population;
        for (band, info) in params.population.bands.iter().enumerate() {
            let exposed = seeded * info.structure;
            y[layout.idx(Compartment::Exposed, band)] = exposed;
            y[layout.idx(Compartment::Susceptible, band)] = info.structure - exposed;
        }
        y
    }

    fn total(&self, y: &[f64], compartment: Compartment) -> f64 {
        (0..self.layout.num_bands)
            .map(|b| y[self.layout.idx(compartment, b)])
            .sum()
    }

    /// Write dy/dt at time `t` into `dy`
    pub fn derivative(&self, t: f64, y: &[f64], dy: &mut [f64]) {
        use Compartment::*;

        let l = self.layout;
        let n = l.num_bands;
        let iv = self.interventions;
        let r = &self.rates;
        dy.fill(0.0);

        let shielded = iv.shielding.used && window_active(iv.shielding.window, t);
        let matrix = self.infection.active(shielded);
        let hygiene = if window_active(iv.better_hygiene.window, t) {
            1.0 - iv.better_hygiene.reduction
        } else {
            1.0
        };
        let beta = r.beta * hygiene;

        // symptomatic removal capacity, shared in proportion to I
        let total_symptomatic = self.total(y, Symptomatic).max(0.0);
        let quarantine_capacity = if iv.remove_symptomatic.rate > 0.0
            && window_active(iv.remove_symptomatic.window, t)
        {
            iv.remove_symptomatic.rate.min(total_symptomatic)
        } else {
            0.0
        };

        // high-risk removal capacity, shared in proportion to occupancy
        let removable = [Susceptible, Exposed, Asymptomatic, Recovered];
        let high_risk_share = if iv.remove_high_risk.rate > 0.0
            && self.high_risk_from < n
            && window_active(iv.remove_high_risk.window, t)
        {
            let pool: f64 = (self.high_risk_from..n)
                .flat_map(|b| removable.iter().map(move |&c| y[l.idx(c, b)]))
                .sum::<f64>()
                .max(0.0);
            if pool > 0.0 {
                iv.remove_high_risk.rate.min(pool) / pool
            } else {
                0.0
            }
        } else {
            0.0
        };

        // ICU admission share
        let demand: f64 = (0..n)
            .map(|b| r.hosp_rate * self.p_critical[b] * y[l.idx(Hospitalised, b)])
            .sum();
        let free_beds = (iv.icu_capacity.fraction - self.total(y, Critical)).max(0.0);
        let admitted = if demand > 0.0 {
            (free_beds / demand).min(1.0)
        } else {
            1.0
        };

        for a in 0..n {
            let cell = |c: Compartment| y[l.idx(c, a)];
            let (s, e) = (cell(Susceptible), cell(Exposed));
            let (i, asym) = (cell(Symptomatic), cell(Asymptomatic));
            let (h, crit) = (cell(Hospitalised), cell(Critical));
            let (q, u) = (cell(Quarantined), cell(NoIcuCare));
            let p_h = self.p_hospitalised[a];
            let p_c = self.p_critical[a];

            let pressure: f64 = (0..n)
                .map(|b| {
                    matrix.get(a, b)
                        * (y[l.idx(Symptomatic, b)]
                            + self.asymptomatic_infectiousness * y[l.idx(Asymptomatic, b)])
                })
                .sum();
            let infections = beta * pressure * s;

            let onset = r.latent_rate * e;
            let to_symptomatic = onset * (1.0 - self.asymptomatic_proportion);
            let to_asymptomatic = onset * self.asymptomatic_proportion;

            let symptomatic_out = r.removal_rate * i;
            let quarantined_in = if total_symptomatic > 0.0 {
                quarantine_capacity * i.max(0.0) / total_symptomatic
            } else {
                0.0
            };
            let quarantine_out = self.quarantine_rate * q;
            let asymptomatic_out = r.removal_rate * asym;

            let hospital_out = r.hosp_rate * h;
            let icu_demand = hospital_out * p_c;
            let critical_out = r.death_rate_with_icu * crit;
            let untreated_deaths = self.untreated_death_rate * u;

            let removal = |c: Compartment| {
                if a >= self.high_risk_from {
                    high_risk_share * cell(c).max(0.0)
                } else {
                    0.0
                }
            };
            let [rm_s, rm_e, rm_a, rm_r] = removable.map(removal);

            dy[l.idx(Susceptible, a)] = -infections - rm_s;
            dy[l.idx(Exposed, a)] = infections - onset - rm_e;
            dy[l.idx(Symptomatic, a)] = to_symptomatic - symptomatic_out - quarantined_in;
            dy[l.idx(Asymptomatic, a)] = to_asymptomatic - asymptomatic_out - rm_a;
            dy[l.idx(Recovered, a)] = symptomatic_out * (1.0 - p_h)
                + asymptomatic_out
                + quarantine_out * (1.0 - p_h)
                + hospital_out * (1.0 - p_c)
                + critical_out * (1.0 - self.death_prob_with_icu)
                - rm_r;
            dy[l.idx(Hospitalised, a)] =
                symptomatic_out * p_h + quarantine_out * p_h - hospital_out;
            dy[l.idx(Critical, a)] = admitted * icu_demand - critical_out;
            dy[l.idx(Dead, a)] = critical_out * self.death_prob_with_icu + untreated_deaths;
            dy[l.idx(Offsite, a)] = rm_s + rm_e + rm_a + rm_r;
            dy[l.idx(Quarantined, a)] = quarantined_in - quarantine_out;
            dy[l.idx(NoIcuCare, a)] = (1.0 - admitted) * icu_demand - untreated_deaths;

            dy[l.cumulative_infections(a)] = infections;
            dy[l.cumulative_symptomatic(a)] = to_symptomatic;
        }
    }
}

/// Integrator state of one iteration
#[derive(Debug, Clone)]
pub struct SimulationState<'a> {
    pub dynamics: Dynamics<'a>,
    pub y: Vec<f64>,
    pub time: f64,
    iteration: usize,
    workspace: Rk4Workspace,
}

impl<'a> SimulationState<'a> {
    pub fn from_parameters(params: &'a ParameterSet, rates: DrawnRates, iteration: usize) -> Self {
        let dynamics = Dynamics::new(params, rates);
        let y = dynamics.initial_state(params);
        let workspace = Rk4Workspace::new(y.len());
        Self {
            dynamics,
            y,
            time: 0.0,
            iteration,
            workspace,
        }
    }

    /// One RK4 step to `time_after`, then a finiteness check
    pub fn step_to(&mut self, time_after: f64) -> Result<(), SimulationDivergedError> {
        let dt = time_after - self.time;
        let dynamics = &self.dynamics;
        rk4_step(&mut self.y, self.time, dt, &mut self.workspace, |t, y, dy| {
            dynamics.derivative(t, y, dy)
        });
        self.time = time_after;

        match first_non_finite(&self.y) {
            Some(cell) => Err(SimulationDivergedError {
                iteration: self.iteration,
                time: self.time,
                cell,
            }),
            None => Ok(()),
        }
    }

    pub fn occupancy(&self) -> &[f64] {
        &self.y[..self.dynamics.layout.population_len()]
    }

    /// Sum of every population cell; 1 at t = 0
    pub fn population(&self) -> f64 {
        self.occupancy().iter().sum()
    }

    /// Cumulative S->E and E->I flow per band
    pub fn accumulators(&self) -> (Vec<f64>, Vec<f64>) {
        let l = self.dynamics.layout;
        (0..l.num_bands)
            .map(|b| (self.y[l.cumulative_infections(b)], self.y[l.cumulative_symptomatic(b)]))
            .unzip()
    }
}
