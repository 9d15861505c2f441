/// Utilities Module
///
/// Raspberry Pi backed implementations of the capabilities in `capabilities`:
/// the GPIO speaker pin, the MCP3008 ADC and the spin-wait delay.
pub mod mcp3008;
pub mod speaker;
pub mod spin_delay;
