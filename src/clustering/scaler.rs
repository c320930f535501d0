use anyhow::{Context, Result};
use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::Array2;

/// Standardise each column to zero mean and unit variance.
///
/// Uses the population standard deviation; a constant column keeps a scale
/// of 1 and so standardises to zero. No rows in, no rows out.
pub fn standardize(records: Array2<f64>) -> Result<Array2<f64>> {
    if records.nrows() == 0 {
        return Ok(records);
    }

    let targets = Array2::<()>::from_elem((records.nrows(), 1), ());
    let dataset = DatasetBase::new(records, targets);
    let scaler = LinearScaler::standard()
        .fit(&dataset)
        .context("failed to fit feature scaler")?;

    let scaled: DatasetBase<Array2<f64>, Array2<()>> = scaler.transform(dataset);
    Ok(scaled.records)
}
