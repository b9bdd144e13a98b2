//! Compartment definitions and category display metadata

use serde::{Deserialize, Serialize};

/// Disease/clinical states tracked per age band, in state-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Symptomatic,
    Asymptomatic,
    Recovered,
    Hospitalised,
    Critical,
    Dead,
    Offsite,
    Quarantined,
    NoIcuCare,
}

impl Compartment {
    pub const ALL: [Compartment; 11] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::Symptomatic,
        Compartment::Asymptomatic,
        Compartment::Recovered,
        Compartment::Hospitalised,
        Compartment::Critical,
        Compartment::Dead,
        Compartment::Offsite,
        Compartment::Quarantined,
        Compartment::NoIcuCare,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Compartment::Susceptible => "S",
            Compartment::Exposed => "E",
            Compartment::Symptomatic => "I",
            Compartment::Asymptomatic => "A",
            Compartment::Recovered => "R",
            Compartment::Hospitalised => "H",
            Compartment::Critical => "C",
            Compartment::Dead => "D",
            Compartment::Offsite => "O",
            Compartment::Quarantined => "Q",
            Compartment::NoIcuCare => "U",
        }
    }

    /// Compartments that still carry an active infection
    pub fn is_active_infection(self) -> bool {
        matches!(
            self,
            Compartment::Exposed
                | Compartment::Symptomatic
                | Compartment::Asymptomatic
                | Compartment::Quarantined
        )
    }
}

/// How a reported category is computed from a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategoryKind {
    /// Occupancy of a single compartment
    Occupancy(Compartment),
    /// New S->E infections since the previous step
    NewInfections,
    /// New E->I symptomatic onsets since the previous step
    NewSymptomatic,
    /// Sum of several compartments
    Sum(Vec<Compartment>),
    /// Change in the sum of several compartments since the previous step
    Change(Vec<Compartment>),
    /// Running total of another category over steps `0..=t`
    Cumulative(Box<CategoryKind>),
}

/// Named category with display attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMeta {
    pub code: String,
    pub short_name: String,
    pub long_name: String,
    /// `rgb(r,g,b)`
    pub colour: String,
    pub kind: CategoryKind,
}

impl CategoryMeta {
    fn new(
        code: &str,
        short_name: &str,
        long_name: &str,
        colour: &str,
        kind: CategoryKind,
    ) -> Self {
        Self {
            code: code.to_string(),
            short_name: short_name.to_string(),
            long_name: long_name.to_string(),
            colour: colour.to_string(),
            kind,
        }
    }

    /// Translucent variant of `colour` for filled areas
    pub fn fill_colour(&self) -> String {
        match self
            .colour
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => format!("rgba({inner},0.1)"),
            None => self.colour.clone(),
        }
    }
}

/// The default category list: every compartment, the change-tracking
/// series, derived groups, then running totals.
pub fn default_categories() -> Vec<CategoryMeta> {
    use CategoryKind::*;
    use Compartment::*;

    vec![
        CategoryMeta::new(
            "S",
            "Susceptible",
            "Susceptible",
            "rgb(0,130,200)",
            Occupancy(Susceptible),
        ),
        CategoryMeta::new(
            "E",
            "Exposed",
            "Exposed (latent)",
            "rgb(255,225,25)",
            Occupancy(Exposed),
        ),
        CategoryMeta::new(
            "I",
            "Symptomatic",
            "Infected (symptomatic)",
            "rgb(230,25,75)",
            Occupancy(Symptomatic),
        ),
        CategoryMeta::new(
            "A",
            "Asymptomatic",
            "Infected (asymptomatic)",
            "rgb(245,130,48)",
            Occupancy(Asymptomatic),
        ),
        CategoryMeta::new(
            "R",
            "Recovered",
            "Recovered",
            "rgb(60,180,75)",
            Occupancy(Recovered),
        ),
        CategoryMeta::new(
            "H",
            "Hospitalised",
            "Hospitalised",
            "rgb(145,30,180)",
            Occupancy(Hospitalised),
        ),
        CategoryMeta::new(
            "C",
            "Critical",
            "Requiring critical care",
            "rgb(240,50,230)",
            Occupancy(Critical),
        ),
        CategoryMeta::new("D", "Deaths", "Deaths", "rgb(0,0,0)", Occupancy(Dead)),
        CategoryMeta::new(
            "O",
            "Offsite",
            "Removed to offsite care",
            "rgb(70,240,240)",
            Occupancy(Offsite),
        ),
        CategoryMeta::new(
            "Q",
            "Quarantined",
            "Quarantined (symptomatic removal)",
            "rgb(170,110,40)",
            Occupancy(Quarantined),
        ),
        CategoryMeta::new(
            "U",
            "No ICU care",
            "Critical without ICU care",
            "rgb(128,0,0)",
            Occupancy(NoIcuCare),
        ),
        CategoryMeta::new(
            "NewInf",
            "New infections",
            "New infections since previous step",
            "rgb(250,190,212)",
            NewInfections,
        ),
        CategoryMeta::new(
            "NewSym",
            "New symptomatic",
            "New symptomatic cases since previous step",
            "rgb(220,190,255)",
            NewSymptomatic,
        ),
        CategoryMeta::new(
            "INF",
            "Infected",
            "Active infections (symptomatic, asymptomatic, quarantined)",
            "rgb(255,80,80)",
            Sum(vec![Symptomatic, Asymptomatic, Quarantined]),
        ),
        CategoryMeta::new(
            "HOSP",
            "Hospital demand",
            "Hospitalised, critical and critical without ICU",
            "rgb(120,60,160)",
            Sum(vec![Hospitalised, Critical, NoIcuCare]),
        ),
        CategoryMeta::new(
            "Ninf",
            "New Infected",
            "Change in total active infections",
            "rgb(255,125,100)",
            Change(vec![Exposed, Symptomatic, Asymptomatic, Quarantined]),
        ),
        CategoryMeta::new(
            "CumInf",
            "Cumulative infections",
            "Infections since the start of the run",
            "rgb(200,90,150)",
            Cumulative(Box::new(NewInfections)),
        ),
        CategoryMeta::new(
            "CumSym",
            "Cumulative symptomatic",
            "Symptomatic cases since the start of the run",
            "rgb(150,110,220)",
            Cumulative(Box::new(NewSymptomatic)),
        ),
        CategoryMeta::new(
            "CumHOSP",
            "Hospital person-days",
            "Hospital demand person-days since the start of the run",
            "rgb(90,40,130)",
            Cumulative(Box::new(Sum(vec![Hospitalised, Critical, NoIcuCare]))),
        ),
    ]
}
