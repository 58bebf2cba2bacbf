//! Message keys and translation
//!
//! Rules report keys plus positional arguments; turning them into text is the
//! caller's business. The expiration check is the one place that formats a
//! message itself, through a [`MessageTranslator`].

/// Keys of blocking errors
pub struct ErrorKeys;

impl ErrorKeys {
    /// Pool cannot cover the requested quantity
    pub const NO_ENTITLEMENTS_AVAILABLE: &'static str = "rulefailed.no.entitlements.available";
    /// Pool ended before now
    pub const POOL_EXPIRED: &'static str = "rulefailed.pool.expired";
    /// Quantity above one on a pool that does not allow it
    pub const MULTI_ENTITLEMENT_UNSUPPORTED: &'static str = "rulefailed.multi-entitlement.unsupported";
    /// Quantity not a multiple of the instance multiplier
    pub const QUANTITY_MISMATCH: &'static str = "rulefailed.quantity.mismatch";
    /// Consumer and pool belong to different owners
    pub const OWNER_MISMATCH: &'static str = "rulefailed.owner.mismatch";
    /// Consumer type not accepted by the pool
    pub const CONSUMER_TYPE_MISMATCH: &'static str = "rulefailed.consumer.type.mismatch";
    /// Pool is reserved for another consumer
    pub const CONSUMER_MISMATCH: &'static str = "consumer.does.not.match.pool.consumer.requirement";
    /// Derived or host-restricted pools cannot be exported
    pub const POOL_NOT_AVAILABLE_TO_MANIFEST: &'static str = "pool.not.available.to.manifest.consumers";
    /// Guest host does not match the pool's host restriction
    pub const HOST_MISMATCH: &'static str = "virt.guest.host.does.not.match";
    /// Virt-only pool requested by a physical consumer
    pub const VIRT_ONLY: &'static str = "rulefailed.virt.only";
    /// Physical-only pool requested by a guest
    pub const PHYSICAL_ONLY: &'static str = "rulefailed.physical.only";
    /// Unmapped-guest pool requested by a guest whose host is known
    pub const UNMAPPED_GUEST_HAS_HOST: &'static str = "virt.guest.cannot.use.unmapped.guest.pool.has.host";
}

/// Keys of non-blocking warnings
pub struct WarningKeys;

impl WarningKeys {
    /// Listing a virt-only pool for a physical consumer
    pub const VIRT_ONLY: &'static str = "rulewarning.virt.only";
    /// Listing a physical-only pool for a guest
    pub const PHYSICAL_ONLY: &'static str = "rulewarning.physical.only";
    /// Consumer architecture not supported by the product
    pub const ARCHITECTURE_MISMATCH: &'static str = "rulewarning.architecture.mismatch";
    /// Consumer has more sockets than one unit covers
    pub const UNSUPPORTED_SOCKETS: &'static str = "rulewarning.unsupported.number.of.sockets";
    /// Consumer has more cores than one unit covers
    pub const UNSUPPORTED_CORES: &'static str = "rulewarning.unsupported.number.of.cores";
    /// Consumer has more RAM than one unit covers
    pub const UNSUPPORTED_RAM: &'static str = "rulewarning.unsupported.ram";
}

/// Template for the expiration error; `{0}` is the product id, `{1}` the end date
pub const EXPIRED_TEMPLATE: &str =
    "Unable to attach subscription for the product \"{0}\": Subscriptions for {0} expired on: {1}";

/// Turns a message key and its arguments into display text
pub trait MessageTranslator {
    /// Produce the text for `key`, starting from the untranslated `template`
    fn translate(&self, key: &str, template: &str, args: &[String]) -> String;
}

/// Untranslated output: substitutes `{n}` placeholders in the template
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTranslator;

impl MessageTranslator for DefaultTranslator {
    fn translate(&self, _key: &str, template: &str, args: &[String]) -> String {
        format_positional(template, args)
    }
}

/// Replace every `{n}` in `template` with `args[n]`; unknown indexes stay as written
///
/// # Examples
///
/// ```
/// use allot_gatekeeper::messages::format_positional;
///
/// let text = format_positional("{0} and {0} then {1}, not {2}", &["a".into(), "b".into()]);
/// assert_eq!(text, "a and a then b, not {2}");
/// ```
pub fn format_positional(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });

        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_template() {
        let text = DefaultTranslator.translate(
            ErrorKeys::POOL_EXPIRED,
            EXPIRED_TEMPLATE,
            &["awesomeos".to_string(), "1700000000".to_string()],
        );
        assert_eq!(
            text,
            "Unable to attach subscription for the product \"awesomeos\": \
             Subscriptions for awesomeos expired on: 1700000000"
        );
    }

    #[test]
    fn test_unmatched_braces_left_alone() {
        assert_eq!(format_positional("{x} {", &[]), "{x} {");
        assert_eq!(format_positional("no placeholders", &[]), "no placeholders");
    }
}
