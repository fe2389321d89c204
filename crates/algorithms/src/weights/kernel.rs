//! Distance-to-weight kernels

use geoweights_core::weights::Conceptualization;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Every neighbor weighs 1
    Unit,
    /// 1/d^exponent, with distances up to 1 weighing 1
    InverseDistance { exponent: f64 },
    /// 1 inside the threshold, 1/((d - threshold) + 1) beyond it
    ZoneOfIndifference { threshold: f64 },
}

impl Kernel {
    /// Kernel for a conceptualization, given its resolved threshold.
    pub fn for_conceptualization(concept: &Conceptualization, threshold: f64) -> Self {
        match *concept {
            Conceptualization::InverseDistance { exponent, .. } => {
                Kernel::InverseDistance { exponent }
            }
            Conceptualization::ZoneOfIndifference { .. } => {
                Kernel::ZoneOfIndifference { threshold }
            }
            _ => Kernel::Unit,
        }
    }

    #[inline]
    pub fn weight(&self, distance: f64) -> f64 {
        match *self {
            Kernel::Unit => 1.0,
            Kernel::InverseDistance { exponent } => {
                if distance <= 1.0 {
                    1.0
                } else {
                    1.0 / distance.powf(exponent)
                }
            }
            Kernel::ZoneOfIndifference { threshold } => {
                if distance <= threshold {
                    1.0
                } else {
                    1.0 / ((distance - threshold) + 1.0)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_distance() {
        let k = Kernel::InverseDistance { exponent: 2.0 };
        assert_eq!(k.weight(0.0), 1.0);
        assert_eq!(k.weight(1.0), 1.0);
        assert!((k.weight(2.0) - 0.25).abs() < 1e-12);
        let k = Kernel::InverseDistance { exponent: 1.0 };
        assert!((k.weight(4.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zone_of_indifference() {
        let k = Kernel::ZoneOfIndifference { threshold: 10.0 };
        assert_eq!(k.weight(3.0), 1.0);
        assert_eq!(k.weight(10.0), 1.0);
        assert!((k.weight(12.0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_for_conceptualization() {
        let c = Conceptualization::FixedDistance { threshold: Some(3.0) };
        assert_eq!(Kernel::for_conceptualization(&c, 3.0), Kernel::Unit);
        let c = Conceptualization::ZoneOfIndifference { threshold: None };
        assert_eq!(
            Kernel::for_conceptualization(&c, 7.5),
            Kernel::ZoneOfIndifference { threshold: 7.5 }
        );
    }
}
