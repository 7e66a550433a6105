//! Machine axes and axis vectors.

use core::fmt;

/// Number of logical axes.
pub const N_AXES: usize = 10;

/// Absolute millimeter value per axis, indexed by [`Axis::index`].
///
/// Axes a program never touches stay at 0.
pub type AxesRegister = [f32; N_AXES];

/// Logical machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// Linear X
    X,
    /// Linear Y
    Y,
    /// Linear Z
    Z,
    /// Extruder
    E,
    /// Auxiliary A
    A,
    /// Auxiliary B
    B,
    /// Auxiliary C
    C,
    /// Auxiliary U
    U,
    /// Auxiliary V
    V,
    /// Auxiliary W
    W,
}

impl Axis {
    /// All axes in register order.
    pub const ALL: [Axis; N_AXES] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::E,
        Axis::A,
        Axis::B,
        Axis::C,
        Axis::U,
        Axis::V,
        Axis::W,
    ];

    /// Look up an axis by its G-code letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Self> {
        let axis = match letter.to_ascii_uppercase() {
            'X' => Axis::X,
            'Y' => Axis::Y,
            'Z' => Axis::Z,
            'E' => Axis::E,
            'A' => Axis::A,
            'B' => Axis::B,
            'C' => Axis::C,
            'U' => Axis::U,
            'V' => Axis::V,
            'W' => Axis::W,
            _ => return None,
        };
        Some(axis)
    }

    /// Upper-case G-code letter.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::E => 'E',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
            Axis::U => 'U',
            Axis::V => 'V',
            Axis::W => 'W',
        }
    }

    /// Position of this axis in an [`AxesRegister`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Set of axes, one bit per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisBitmap(u16);

impl AxisBitmap {
    /// No axes.
    pub const EMPTY: Self = Self(0);

    /// Every axis.
    pub const ALL: Self = Self((1 << N_AXES) - 1);

    /// Create from raw bits; bits beyond [`N_AXES`] are dropped.
    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Add an axis.
    #[inline]
    pub fn insert(&mut self, axis: Axis) {
        self.0 |= 1 << axis.index();
    }

    /// Builder-style [`insert`](Self::insert).
    #[inline]
    #[must_use]
    pub fn with(mut self, axis: Axis) -> Self {
        self.insert(axis);
        self
    }

    /// Check membership.
    #[inline]
    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// True if no axis is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained axes in register order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Axis> for AxisBitmap {
    fn from_iter<I: IntoIterator<Item = Axis>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, AxisBitmap::with)
    }
}
