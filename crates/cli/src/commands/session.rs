//! Session inspection and teardown.

use blossom_client::ShopClient;

/// Print the current session state and cached identity.
#[allow(clippy::print_stdout)]
pub fn status(client: &ShopClient) {
    println!("state: {:?}", client.session().state());
    match client.session().identity() {
        Some(identity) => {
            println!("user:  {} (id {})", identity.display_name, identity.user_id);
            if let Some(username) = identity.username {
                println!("       @{username}");
            }
        }
        None => println!("user:  (none)"),
    }
}

/// Report the result of the login attempt made at startup.
#[allow(clippy::print_stdout)]
pub fn login(client: &ShopClient) {
    println!("session settled as {:?}", client.session().state());
}

/// Clear the session and persisted credential.
#[allow(clippy::print_stdout)]
pub fn logout(client: &ShopClient) {
    client.logout();
    println!("logged out");
}
