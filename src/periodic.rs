//! Static periodic table used to resolve element symbols read from structure files.
//!
//! Only the reference data the charge models need is carried: atomic number, symbol, name,
//! standard atomic mass, and Pauling electronegativity. Noble gases without a Pauling value
//! store `0.0`.

use crate::error::ChargeError;

/// Reference data for one chemical element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// The atomic number (1 for hydrogen, 6 for carbon, etc.).
    pub number: u8,
    /// The case-sensitive element symbol, e.g. `"Cl"`.
    pub symbol: &'static str,
    /// The English element name.
    pub name: &'static str,
    /// Standard atomic mass in daltons.
    pub mass: f64,
    /// Pauling electronegativity.
    pub electronegativity: f64,
}

macro_rules! element {
    ($number:expr, $symbol:expr, $name:expr, $mass:expr, $chi:expr) => {
        Element {
            number: $number,
            symbol: $symbol,
            name: $name,
            mass: $mass,
            electronegativity: $chi,
        }
    };
}

static ELEMENTS: &[Element] = &[
    element!(1, "H", "Hydrogen", 1.008, 2.20),
    element!(2, "He", "Helium", 4.0026, 0.0),
    element!(3, "Li", "Lithium", 6.94, 0.98),
    element!(4, "Be", "Beryllium", 9.0122, 1.57),
    element!(5, "B", "Boron", 10.81, 2.04),
    element!(6, "C", "Carbon", 12.011, 2.55),
    element!(7, "N", "Nitrogen", 14.007, 3.04),
    element!(8, "O", "Oxygen", 15.999, 3.44),
    element!(9, "F", "Fluorine", 18.998, 3.98),
    element!(10, "Ne", "Neon", 20.180, 0.0),
    element!(11, "Na", "Sodium", 22.990, 0.93),
    element!(12, "Mg", "Magnesium", 24.305, 1.31),
    element!(13, "Al", "Aluminium", 26.982, 1.61),
    element!(14, "Si", "Silicon", 28.085, 1.90),
    element!(15, "P", "Phosphorus", 30.974, 2.19),
    element!(16, "S", "Sulfur", 32.06, 2.58),
    element!(17, "Cl", "Chlorine", 35.45, 3.16),
    element!(18, "Ar", "Argon", 39.948, 0.0),
    element!(19, "K", "Potassium", 39.098, 0.82),
    element!(20, "Ca", "Calcium", 40.078, 1.00),
    element!(21, "Sc", "Scandium", 44.956, 1.36),
    element!(22, "Ti", "Titanium", 47.867, 1.54),
    element!(23, "V", "Vanadium", 50.942, 1.63),
    element!(24, "Cr", "Chromium", 51.996, 1.66),
    element!(25, "Mn", "Manganese", 54.938, 1.55),
    element!(26, "Fe", "Iron", 55.845, 1.83),
    element!(27, "Co", "Cobalt", 58.933, 1.88),
    element!(28, "Ni", "Nickel", 58.693, 1.91),
    element!(29, "Cu", "Copper", 63.546, 1.90),
    element!(30, "Zn", "Zinc", 65.38, 1.65),
    element!(31, "Ga", "Gallium", 69.723, 1.81),
    element!(32, "Ge", "Germanium", 72.630, 2.01),
    element!(33, "As", "Arsenic", 74.922, 2.18),
    element!(34, "Se", "Selenium", 78.971, 2.55),
    element!(35, "Br", "Bromine", 79.904, 2.96),
    element!(36, "Kr", "Krypton", 83.798, 3.00),
    element!(37, "Rb", "Rubidium", 85.468, 0.82),
    element!(38, "Sr", "Strontium", 87.62, 0.95),
    element!(39, "Y", "Yttrium", 88.906, 1.22),
    element!(40, "Zr", "Zirconium", 91.224, 1.33),
    element!(41, "Nb", "Niobium", 92.906, 1.6),
    element!(42, "Mo", "Molybdenum", 95.95, 2.16),
    element!(43, "Tc", "Technetium", 98.0, 1.9),
    element!(44, "Ru", "Ruthenium", 101.07, 2.2),
    element!(45, "Rh", "Rhodium", 102.91, 2.28),
    element!(46, "Pd", "Palladium", 106.42, 2.20),
    element!(47, "Ag", "Silver", 107.87, 1.93),
    element!(48, "Cd", "Cadmium", 112.41, 1.69),
    element!(49, "In", "Indium", 114.82, 1.78),
    element!(50, "Sn", "Tin", 118.71, 1.96),
    element!(51, "Sb", "Antimony", 121.76, 2.05),
    element!(52, "Te", "Tellurium", 127.60, 2.1),
    element!(53, "I", "Iodine", 126.90, 2.66),
    element!(54, "Xe", "Xenon", 131.29, 2.6),
];

/// Looks up an element by its case-sensitive symbol.
pub fn by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|element| element.symbol == symbol)
}

/// Looks up an element by atomic number.
pub fn by_number(number: u8) -> Option<&'static Element> {
    ELEMENTS.get(usize::from(number).checked_sub(1)?)
}

/// Resolves a symbol as written in structure files, where case is not reliable (`"CL"`, `"cl"`).
pub fn lookup(symbol: &str) -> Result<&'static Element, ChargeError> {
    let trimmed = symbol.trim();
    by_symbol(trimmed)
        .or_else(|| {
            ELEMENTS
                .iter()
                .find(|element| element.symbol.eq_ignore_ascii_case(trimmed))
        })
        .ok_or_else(|| ChargeError::UnknownElement(trimmed.to_string()))
}
