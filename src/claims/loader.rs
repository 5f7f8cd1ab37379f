//! Load monthly experience and large-claimant listings from CSV
//!
//! Column headers follow the normalized ingestion vocabulary. Dates are
//! ISO `YYYY-MM-DD`.

use super::{LargeClaimant, MonthlyClaimsPoint};
use chrono::NaiveDate;
use csv::Reader;
use std::error::Error;
use std::path::Path;

/// Raw CSV row for the monthly experience file
#[derive(Debug, serde::Deserialize)]
struct ClaimsRow {
    #[serde(rename = "Month")]
    month: NaiveDate,
    #[serde(rename = "MemberMonths")]
    member_months: f64,
    #[serde(rename = "MedicalMemberMonths", default)]
    medical_member_months: Option<f64>,
    #[serde(rename = "RxMemberMonths", default)]
    rx_member_months: Option<f64>,
    #[serde(rename = "MedicalClaims")]
    medical_claims: f64,
    #[serde(rename = "Capitation", default)]
    capitation: Option<f64>,
    #[serde(rename = "RxClaims")]
    rx_claims: f64,
    #[serde(rename = "TotalClaims", default)]
    total_claims: Option<f64>,
}

impl ClaimsRow {
    fn to_point(self) -> Result<MonthlyClaimsPoint, Box<dyn Error>> {
        let point = MonthlyClaimsPoint {
            month: self.month,
            member_months: self.member_months,
            medical_member_months: self.medical_member_months,
            rx_member_months: self.rx_member_months,
            medical_claims: self.medical_claims,
            capitation: self.capitation.unwrap_or(0.0),
            rx_claims: self.rx_claims,
        };

        // A reported total must agree with medical + capitation + rx
        if let Some(total) = self.total_claims {
            let derived = point.claims().total();
            if (total - derived).abs() > 0.01 {
                return Err(format!(
                    "TotalClaims {:.2} for {} does not equal medical + rx {:.2}",
                    total, self.month, derived
                )
                .into());
            }
        }

        Ok(point)
    }
}

/// Raw CSV row for the large-claimant listing
#[derive(Debug, serde::Deserialize)]
struct ClaimantRow {
    #[serde(rename = "ClaimantID", default)]
    claimant_id: String,
    #[serde(rename = "IncurredDate")]
    incurred_date: NaiveDate,
    #[serde(rename = "TotalPaid", default)]
    total: Option<f64>,
    #[serde(rename = "MedicalPaid", default)]
    medical: Option<f64>,
    #[serde(rename = "RxPaid", default)]
    rx: Option<f64>,
    #[serde(rename = "Diagnosis", default)]
    diagnosis: Option<String>,
}

impl From<ClaimantRow> for LargeClaimant {
    fn from(row: ClaimantRow) -> Self {
        LargeClaimant {
            claimant_id: row.claimant_id,
            incurred_date: row.incurred_date,
            total_amount: row.total,
            medical_amount: row.medical,
            rx_amount: row.rx,
            diagnosis: row.diagnosis.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Load the monthly experience series from a CSV file
pub fn load_claims<P: AsRef<Path>>(path: P) -> Result<Vec<MonthlyClaimsPoint>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    load_claims_from_reader(file)
}

/// Load the monthly experience series from any reader
pub fn load_claims_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<MonthlyClaimsPoint>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut points = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ClaimsRow = result?;
        points.push(row.to_point()?);
    }

    Ok(points)
}

/// Load the large-claimant listing from a CSV file
pub fn load_claimants<P: AsRef<Path>>(path: P) -> Result<Vec<LargeClaimant>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    load_claimants_from_reader(file)
}

/// Load the large-claimant listing from any reader
pub fn load_claimants_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<LargeClaimant>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut claimants = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ClaimantRow = result?;
        claimants.push(row.into());
    }

    Ok(claimants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_claims_from_reader() {
        let data = "\
Month,MemberMonths,MedicalClaims,Capitation,RxClaims,TotalClaims
2024-01-01,577,300000.50,1200,110000,411200.50
2024-02-01,580,295000,,112500,
";
        let points = load_claims_from_reader(data.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].month, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(points[0].capitation, 1200.0);
        assert_eq!(points[1].capitation, 0.0);
        assert_eq!(points[1].medical_member_months, None);
    }

    #[test]
    fn test_rejects_inconsistent_total() {
        let data = "\
Month,MemberMonths,MedicalClaims,RxClaims,TotalClaims
2024-01-01,577,300000,110000,500000
";
        let err = load_claims_from_reader(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("does not equal"));
    }

    #[test]
    fn test_load_claimants_from_reader() {
        let data = "\
ClaimantID,IncurredDate,TotalPaid,MedicalPaid,RxPaid,Diagnosis
LC-1,2024-03-15,260000,240000,20000,Oncology
LC-2,2024-07-02,,190000,5000,
";
        let claimants = load_claimants_from_reader(data.as_bytes()).unwrap();
        assert_eq!(claimants.len(), 2);
        assert_eq!(claimants[0].diagnosis.as_deref(), Some("Oncology"));
        assert_eq!(claimants[1].total_amount, None);
        assert_eq!(claimants[1].diagnosis, None);
    }
}
