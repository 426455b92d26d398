pub(super) fn within_bounds<T>(x: &[T], lower: T, upper: T) -> bool
where
    T: PartialOrd + Copy,
{
    x.iter().all(|&x| x >= lower && x <= upper)
}

pub(super) fn within_unit_cube(x: &[f64]) -> bool {
    within_bounds(x, 0.0, 1.0)
}
