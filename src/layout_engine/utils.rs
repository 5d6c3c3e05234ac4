use crate::sys::geometry::{Rect, Strut};

/// The part of `screen` not reserved by any panel or dock. Each edge loses
/// the largest reservation any window makes for it.
pub fn usable_area(screen: Rect, struts: &[Strut]) -> Rect {
    struts.iter().fold(Strut::default(), |acc, s| acc.max(*s)).apply(screen)
}

/// `total * ratio`, truncated towards zero.
pub(crate) fn fraction(total: i32, ratio: f64) -> i32 { (f64::from(total) * ratio) as i32 }
