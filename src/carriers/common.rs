//! Line blocks several carriers record in the same shape

use crate::claims::{Carrier, Figures, Periods, UniversalInput};
use crate::rating::{
    steps, AdjustmentFactor, CalculationSheet, DataQuality, RatingContext, RatingParameters, RenewalResult,
};

/// Claims PMPM through pooling: six lines
///
/// Incurred claims PMPM, member months, pooled claims, net claims, pooling
/// charge and net claims with the charge added back.
pub(crate) fn pooled_experience(
    ctx: &RatingContext,
    rating: &RatingParameters,
    sheet: &mut CalculationSheet,
) -> Periods<Figures> {
    let raw = Periods::new(
        steps::claims_pmpm(&ctx.periods.current, sheet),
        ctx.periods.prior.as_ref().map(|p| steps::claims_pmpm(p, sheet)),
    );
    let incurred = sheet.amounts("Incurred claims PMPM", raw);
    sheet.scalars("Member months", ctx.periods.map(|p| p.member_months.total));

    let pooled = sheet.amounts(
        "Claims above pooling threshold PMPM",
        ctx.pooling.map(|outcome| outcome.poolable_pmpm),
    );
    let net = sheet.amounts("Net claims PMPM", incurred.zip_with(&pooled, |i, p| *i - *p));
    let charge = sheet.amounts(
        "Pooling charge PMPM",
        net.map(|n| steps::pooling_charge(*n, rating.pooling_charge)),
    );
    sheet.amounts("Net claims with pooling charge PMPM", net.zip_with(&charge, |n, c| *n + *c))
}

/// One factor line per adjustment, then the adjusted claims line
pub(crate) fn adjust(
    base: Periods<Figures>,
    factors: &[AdjustmentFactor],
    sheet: &mut CalculationSheet,
) -> Periods<Figures> {
    for factor in factors {
        let pair = factor.pair();
        sheet.factors(&format!("{} factor", factor.name), base.map(|_| pair));
    }
    let combined = steps::combined_factor(factors);
    sheet.amounts("Adjusted claims PMPM", base.map(|b| b.scale_by(combined)))
}

/// Months of trend, trend factor and projected claims
pub(crate) fn project(
    adjusted: Periods<Figures>,
    ctx: &RatingContext,
    rating: &RatingParameters,
    sheet: &mut CalculationSheet,
) -> Periods<Figures> {
    let months = sheet.scalars("Months of trend", trend_months_for(&adjusted, ctx));
    let factors = sheet.factors("Trend factor", months.map(|m| steps::trend_factor(&rating.trend, *m)));
    sheet.amounts("Projected claims PMPM", adjusted.zip_with(&factors, |a, f| a.scale_by(*f)))
}

/// Trend months restricted to the periods being projected
pub(crate) fn trend_months_for(projected: &Periods<Figures>, ctx: &RatingContext) -> Periods<f64> {
    Periods::new(
        ctx.trend_months.current,
        projected.prior.and(ctx.trend_months.prior),
    )
}

/// Period weight, weighted experience, credibility, manual and blended claims
///
/// Returns the blended claims PMPM and the credibility achieved.
pub(crate) fn credibility_blend(
    projected: Periods<Figures>,
    ctx: &RatingContext,
    rating: &RatingParameters,
    sheet: &mut CalculationSheet,
) -> (Figures, f64) {
    let weights = steps::effective_weights(rating.weights, &ctx.periods);
    sheet.scalars("Period weight", steps::weight_periods(weights, projected.has_prior()));
    let experience = sheet.amount("Weighted experience claims PMPM", steps::weighted_experience(&projected, weights));

    let exposure = ctx.credibility_member_months(weights);
    let z = steps::credibility(
        rating.credibility.formula,
        exposure,
        rating.credibility.full_credibility_member_months,
    );
    sheet.scalar("Credibility", z);

    let manual = sheet.amount("Manual claims PMPM", ctx.manual_rates.figures());
    let blended = sheet.amount("Blended claims PMPM", steps::blend(experience, manual, z));
    (blended, z)
}

/// Sum of every retention component as PMPM on the blended base
pub(crate) fn total_retention(rating: &RatingParameters, blended: Figures) -> Figures {
    rating
        .retention
        .components()
        .iter()
        .fold(Figures::zero(), |acc, (_, component)| acc + steps::retention_pmpm(*component, blended))
}

/// Record the rate change line and assemble the result
pub(crate) fn finish(
    carrier: Carrier,
    input: &UniversalInput,
    ctx: RatingContext,
    mut sheet: CalculationSheet,
    final_premium: Figures,
    rating: &RatingParameters,
    credibility: f64,
) -> RenewalResult {
    let final_premium_pmpm = sheet.round_amount(final_premium.total());
    let current_premium_pmpm = rating.current_premium_pmpm;
    let rate_change = steps::rate_change(final_premium_pmpm, current_premium_pmpm, &mut sheet);
    sheet.scalar("Rate change", rate_change);

    let summary = ctx.summary();
    let (calculations, sheet_warnings) = sheet.finish();
    let mut warnings = ctx.warnings;
    warnings.extend(sheet_warnings);

    log::info!(
        "{} renewal for {}: {:.2} PMPM vs {:.2} current ({:+.2}%), {} lines, {} warnings",
        carrier,
        input.case_id,
        final_premium_pmpm,
        current_premium_pmpm,
        rate_change * 100.0,
        calculations.len(),
        warnings.len()
    );

    RenewalResult {
        carrier,
        case_id: input.case_id.clone(),
        calculations,
        final_premium_pmpm,
        current_premium_pmpm,
        rate_change,
        summary,
        data_quality: DataQuality { credibility, warnings },
    }
}
