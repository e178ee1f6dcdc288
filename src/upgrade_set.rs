use crate::step::UpgradeStep;

/// A type that owns the whole upgrade chain for one family of events.
///
/// ```ignore
/// struct OrderEvents;
///
/// impl UpgradeSet for OrderEvents {
///     fn upgrades() -> Vec<UpgradeStep> {
///         upgrades![
///             "1" => "2" : add_currency,
///             "2" => "3" : split_address,
///         ]
///     }
/// }
///
/// let upgrader = Upgrader::from_set::<OrderEvents>()?;
/// ```
pub trait UpgradeSet {
    fn upgrades() -> Vec<UpgradeStep>;
}
