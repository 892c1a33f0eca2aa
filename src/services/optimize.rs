#[derive(Clone, Debug)]
pub struct GoldenSectionConfig {
    pub lower: f64,
    pub upper: f64,
    pub tolerance: f64,
    pub max_steps: u64,
}

#[derive(Debug)]
pub struct GoldenSectionOutcome {
    pub iterations: u64,
    pub optimal_value: f64,
    pub optimal_objective: f64,
}

/// Maximises a unimodal function over `[lower, upper]`.
pub fn golden_section_max(config: GoldenSectionConfig, mut objective_f: impl FnMut(f64) -> f64) -> GoldenSectionOutcome {
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let (mut lower, mut upper) = (config.lower, config.upper);
    let mut left = upper - inv_phi * (upper - lower);
    let mut right = lower + inv_phi * (upper - lower);
    let (mut left_obj, mut right_obj) = (objective_f(left), objective_f(right));

    let mut iterations = 0;
    while iterations < config.max_steps && upper - lower > config.tolerance {
        iterations += 1;
        if left_obj >= right_obj {
            upper = right;
            right = left;
            right_obj = left_obj;
            left = upper - inv_phi * (upper - lower);
            left_obj = objective_f(left);
        } else {
            lower = left;
            left = right;
            left_obj = right_obj;
            right = lower + inv_phi * (upper - lower);
            right_obj = objective_f(right);
        }
    }

    let optimal_value = (lower + upper) / 2.0;
    GoldenSectionOutcome {
        iterations,
        optimal_value,
        optimal_objective: objective_f(optimal_value),
    }
}
