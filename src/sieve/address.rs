/// Address-literal validation used for `redirect` targets and vacation
/// addresses.
pub trait AddressValidator {
    fn is_valid_address(&self, address: &str) -> bool;
}

/// Accepts a bare RFC 5322 `addr-spec`: `local-part@domain` without display
/// names, comments or angle brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddrSpecValidator;

const ATEXT_SPECIALS: &[u8] = b"!#$%&'*+-/=?^_`{|}~";

impl AddressValidator for AddrSpecValidator {
    fn is_valid_address(&self, address: &str) -> bool {
        let Some((local, domain)) = address.rsplit_once('@') else {
            return false;
        };
        valid_local_part(local) && valid_domain(domain)
    }
}

fn valid_local_part(local: &str) -> bool {
    if let Some(quoted) = local.strip_prefix('"').and_then(|l| l.strip_suffix('"')) {
        return quoted.bytes().all(|b| b.is_ascii_graphic() || b == b' ');
    }
    dot_atom(local, |b| b.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(&b))
}

fn valid_domain(domain: &str) -> bool {
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return !literal.is_empty()
            && literal
                .bytes()
                .all(|b| b.is_ascii_graphic() && !matches!(b, b'[' | b']' | b'\\'));
    }
    dot_atom(domain, |b| b.is_ascii_alphanumeric() || b == b'-')
}

fn dot_atom(s: &str, atext: impl Fn(u8) -> bool) -> bool {
    !s.is_empty()
        && s
            .split('.')
            .all(|atom| !atom.is_empty() && atom.bytes().all(&atext))
}
