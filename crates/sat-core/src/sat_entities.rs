// Entities of the simulated terminal stack
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum SatEntity {
    /// Physical layer of the user terminal
    Phy,
    /// Return-link MAC of the user terminal
    Mac,
    /// Link-layer queueing above the MAC
    Llc,
    /// Capacity request manager
    Rm,
    /// Network control centre, reached over the air
    Ncc,
}
