//! CSV readers for the tabular scenario inputs

use std::fs::{self, File};
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use epicamp_core::config::{InterventionProfile, ProfileRow};
use epicamp_core::contact::{ContactLibrary, ContactMatrix};
use epicamp_core::model::{DiseaseRateTable, DiseaseRow, DrawnRates, PopulationRow, RowKind};

fn reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .wrap_err_with(|| format!("cannot open {}", path.display()))
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    reader(path)?
        .deserialize()
        .enumerate()
        .map(|(i, record)| {
            record.wrap_err_with(|| format!("{}: malformed record {}", path.display(), i + 1))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct DiseaseRecord {
    #[serde(rename = "Type")]
    kind: RowKind,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "CV", default)]
    cv: Option<f64>,
}

pub fn read_disease_table(path: &Path) -> Result<DiseaseRateTable> {
    let rows = read_records::<DiseaseRecord>(path)?
        .into_iter()
        .map(|r| DiseaseRow {
            kind: r.kind,
            name: r.name,
            value: r.value,
            cv: r.cv,
        })
        .collect();
    Ok(DiseaseRateTable::new(rows))
}

#[derive(Debug, Deserialize)]
struct PopulationRecord {
    #[serde(rename = "Camp", default)]
    camp: Option<String>,
    #[serde(rename = "Age")]
    age: String,
    #[serde(rename = "Population_structure")]
    population_structure: f64,
    #[serde(rename = "Total_population")]
    total_population: f64,
    #[serde(rename = "Hosp_given_symptomatic")]
    hosp_given_symptomatic: f64,
    #[serde(rename = "Critical_given_hospitalised")]
    critical_given_hospitalised: f64,
}

/// Population rows, restricted to `camp` when the table covers several camps
pub fn read_population(path: &Path, camp: Option<&str>) -> Result<Vec<PopulationRow>> {
    let rows: Vec<PopulationRow> = read_records::<PopulationRecord>(path)?
        .into_iter()
        .filter(|r| match (camp, r.camp.as_deref()) {
            (Some(wanted), Some(found)) => wanted == found,
            _ => true,
        })
        .map(|r| PopulationRow {
            age: r.age,
            population_structure_pct: r.population_structure,
            total_population: r.total_population,
            hosp_given_symptomatic_pct: r.hosp_given_symptomatic,
            critical_given_hospitalised_pct: r.critical_given_hospitalised,
        })
        .collect();

    if rows.is_empty() {
        return Err(match camp {
            Some(camp) => eyre!("{}: no rows for camp {camp:?}", path.display()),
            None => eyre!("{}: population table is empty", path.display()),
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    #[serde(rename = "Profile", default)]
    profile: Option<String>,
    #[serde(rename = "Parameter")]
    parameter: String,
    #[serde(rename = "Start Time", default)]
    start_time: Option<String>,
    #[serde(rename = "End Time", default)]
    end_time: Option<String>,
    #[serde(rename = "Value")]
    value: String,
}

/// Intervention profile, restricted to `name` when the table holds several
pub fn read_profile(path: &Path, name: Option<&str>) -> Result<InterventionProfile> {
    let rows: Vec<ProfileRow> = read_records::<ProfileRecord>(path)?
        .into_iter()
        .filter(|r| match (name, r.profile.as_deref()) {
            (Some(wanted), Some(found)) => wanted == found,
            _ => true,
        })
        .map(|r| ProfileRow {
            parameter: r.parameter,
            start_time: r.start_time,
            end_time: r.end_time,
            value: r.value,
        })
        .collect();

    if rows.is_empty() {
        return Err(eyre!("{}: no profile rows selected", path.display()));
    }
    Ok(InterventionProfile::new(rows))
}

/// Square numeric matrix with a header row
pub fn read_matrix(path: &Path) -> Result<ContactMatrix> {
    let mut rows = Vec::new();
    for (i, record) in reader(path)?.records().enumerate() {
        let record = record.wrap_err_with(|| format!("{}: row {}", path.display(), i + 1))?;
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().wrap_err_with(|| {
                    format!("{}: row {}: {field:?} is not a number", path.display(), i + 1)
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    ContactMatrix::new(rows).wrap_err_with(|| format!("{}: invalid contact matrix", path.display()))
}

/// Fine matrices from `<country>.csv` files in `dir`, plus an optional
/// coarse fallback
pub fn read_contact_library(dir: Option<&Path>, fallback: Option<&Path>) -> Result<ContactLibrary> {
    let mut library = ContactLibrary::default();

    if let Some(dir) = dir {
        let entries = fs::read_dir(dir).wrap_err_with(|| format!("cannot list {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "csv") {
                continue;
            }
            let Some(country) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            library = library.with_country(country, read_matrix(&path)?);
        }
        tracing::debug!(countries = library.fine_matrices.len(), "contact library loaded");
    }

    if let Some(path) = fallback {
        library = library.with_fallback(read_matrix(path)?);
    }
    Ok(library)
}

/// Pre-generated draws, one row per draw with the rate names as headers
pub fn read_generated_draws(path: &Path) -> Result<Vec<DrawnRates>> {
    read_records(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_disease_table_with_blank_cv() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "disease.csv",
            "Type,Name,Value,CV\nModel Parameter,R0,2.5,0.1\nControl,Better hygiene,0.3,\n",
        );
        let table = read_disease_table(&path).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].kind, RowKind::Model);
        assert_eq!(table.rows[0].cv, Some(0.1));
        assert_eq!(table.rows[1].kind, RowKind::Control);
        assert_eq!(table.rows[1].cv, None);
    }

    #[test]
    fn test_population_filtered_by_camp() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "population.csv",
            "Camp,Age,Population_structure,Total_population,Hosp_given_symptomatic,Critical_given_hospitalised\n\
             A,0-39,70,10000,5,30\n\
             A,40+,30,10000,20,40\n\
             B,0-79,100,5000,5,30\n",
        );
        assert_eq!(read_population(&path, None).unwrap().len(), 3);
        let b = read_population(&path, Some("B")).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].total_population, 5000.0);
        assert!(read_population(&path, Some("C")).is_err());
    }

    #[test]
    fn test_profile_blank_times_are_none() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "profile.csv",
            "Profile,Parameter,Start Time,End Time,Value\n\
             a,better_hygiene,,,0.3\n\
             b,better_hygiene,10,60,0.5\n",
        );
        let profile = read_profile(&path, Some("b")).unwrap();
        assert_eq!(profile.rows.len(), 1);
        assert_eq!(profile.rows[0].start_time.as_deref(), Some("10"));
        assert_eq!(profile.rows[0].value, "0.5");

        let a = read_profile(&path, Some("a")).unwrap();
        assert_eq!(a.rows[0].start_time, None);
    }

    #[test]
    fn test_matrix_rejects_text_and_non_square() {
        let dir = tempdir().unwrap();
        let good = write(dir.path(), "good.csv", "x,y\n6,2\n2,3\n");
        assert_eq!(read_matrix(&good).unwrap().size(), 2);

        let text = write(dir.path(), "text.csv", "x,y\n6,two\n2,3\n");
        assert!(read_matrix(&text).is_err());

        let ragged = write(dir.path(), "ragged.csv", "x,y\n6,2\n2,3\n1,1\n");
        assert!(read_matrix(&ragged).is_err());
    }

    #[test]
    fn test_contact_library_keys_by_file_stem() {
        let dir = tempdir().unwrap();
        let header = (0..16).map(|i| format!("c{i}")).collect::<Vec<_>>().join(",");
        let fine: String = std::iter::once(header)
            .chain((0..16).map(|_| vec!["1"; 16].join(",")))
            .map(|line| line + "\n")
            .collect();
        write(dir.path(), "Bangladesh.csv", &fine);
        write(dir.path(), "notes.txt", "ignored");
        let fallback = write(dir.path(), "fallback.matrix", "x\n4\n");

        let library = read_contact_library(Some(dir.path()), Some(&fallback)).unwrap();
        assert!(library.is_supported("Bangladesh"));
        assert_eq!(library.fine_matrices.len(), 1);
        assert_eq!(library.fallback.as_ref().map(ContactMatrix::size), Some(1));
    }

    #[test]
    fn test_generated_draws() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "draws.csv",
            "beta,latent_rate,removal_rate,hosp_rate,death_rate,death_rate_with_icu\n\
             0.3,0.2,0.14,0.125,0.25,0.1\n",
        );
        let draws = read_generated_draws(&path).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].removal_rate, 0.14);
    }
}
