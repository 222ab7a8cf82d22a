//! Engine options fixed at construction.

/// Feature toggles for one engine instance.
///
/// Presets cover the common parts; the builder methods derive variants.
///
/// ```
/// use mos_6502::Config;
///
/// let cfg = Config::NMOS.with_decimal(false);
/// assert_eq!(cfg, Config::RICOH_2A03);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Execute the undocumented composite opcodes. When off they run as NOP
    /// with the table's addressing mode and cycle count.
    pub undocumented: bool,
    /// Honour the D flag in ADC/SBC.
    pub decimal: bool,
}

impl Config {
    /// Stock NMOS 6502.
    pub const NMOS: Self = Self {
        undocumented: true,
        decimal: true,
    };

    /// NES CPU: the decimal circuit is disconnected.
    pub const RICOH_2A03: Self = Self {
        undocumented: true,
        decimal: false,
    };

    /// Official instruction set only.
    pub const DOCUMENTED: Self = Self {
        undocumented: false,
        decimal: true,
    };

    #[must_use]
    pub const fn with_undocumented(mut self, enabled: bool) -> Self {
        self.undocumented = enabled;
        self
    }

    #[must_use]
    pub const fn with_decimal(mut self, enabled: bool) -> Self {
        self.decimal = enabled;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::NMOS
    }
}
