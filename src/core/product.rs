//! Saturating vector product.
//!
//! Rules, first match wins:
//! 1. an empty vector yields `0.0`;
//! 2. a vector holding an exact zero yields `0.0`;
//! 3. if a multiply would push the magnitude past `f64::MAX`, the fold stops and
//!    returns [`SATURATED_POSITIVE`] or [`SATURATED_NEGATIVE`] by sign;
//! 4. otherwise the plain left-to-right IEEE-754 product.

/// Returned instead of a positive overflow: 2^63 - 1 (rounds to 2^63 as a double).
pub const SATURATED_POSITIVE: f64 = i64::MAX as f64;

/// Returned instead of a negative overflow: -2^63.
pub const SATURATED_NEGATIVE: f64 = i64::MIN as f64;

/// Outcome of evaluating one vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Product {
    /// The ordinary floating-point product.
    Exact(f64),
    /// A saturation sentinel; the true product overflowed.
    Saturated(f64),
}

impl Product {
    /// The value sent back to the peer.
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            Product::Exact(v) | Product::Saturated(v) => v,
        }
    }

    #[inline]
    pub fn is_saturated(self) -> bool {
        matches!(self, Product::Saturated(_))
    }
}

/// Evaluate a vector, keeping track of whether saturation kicked in.
pub fn evaluate(vector: &[f64]) -> Product {
    if vector.is_empty() || vector.iter().any(|&x| x == 0.0) {
        return Product::Exact(0.0);
    }

    let mut product = 1.0_f64;
    let mut negative = false;

    for &x in vector {
        negative ^= x.is_sign_negative();

        if product.abs() > f64::MAX / x.abs() {
            return Product::Saturated(sentinel(negative));
        }

        product *= x;

        // The quotient above is rounded, so the multiply can still land on infinity.
        if product.is_infinite() {
            return Product::Saturated(sentinel(negative));
        }
    }

    Product::Exact(product)
}

#[inline]
fn sentinel(negative: bool) -> f64 {
    if negative {
        SATURATED_NEGATIVE
    } else {
        SATURATED_POSITIVE
    }
}

/// Saturating product of a vector's elements.
#[inline]
pub fn product_of(vector: &[f64]) -> f64 {
    evaluate(vector).value()
}
