//! Unix abstract-namespace socket naming (spec §6):
//!
//! ```text
//! server listen address: "s" <type> <link> <mode> "-" <socketName>
//! client local bind:     "c" <type> <link> <mode> "-" <socketName>
//! ```
//!
//! Kept decoupled from `relaycast_link`'s `LinkKind`/`LinkMode` enums (core
//! sits below link in the dependency order) by taking their discriminants
//! as plain integers.

/// Build the abstract-namespace name used for a server listen socket or a
/// client's local datagram bind. `side` is `'s'` for the server, `'c'` for
/// the client, matching spec §6 literally.
pub fn abstract_name(side: char, type_code: u8, link_code: u8, mode_code: u8, socket_name: &str) -> String {
    format!("{side}{type_code}{link_code}{mode_code}-{socket_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_and_client_names_differ_only_by_side() {
        let server = abstract_name('s', 1, 2, 0, "feed");
        let client = abstract_name('c', 1, 2, 0, "feed");
        assert_eq!(server, "s120-feed");
        assert_eq!(client, "c120-feed");
    }
}
