//! Raw stanzas for requests the client has no method for.

use wacore_binary::builder::NodeBuilder;
use wacore_binary::jid::{Jid, JidExt};
use wacore_binary::node::Node;

/// Ask the server to push presence updates for `to`.
pub(super) fn presence_subscribe(to: &Jid) -> Node {
    NodeBuilder::new("presence")
        .attr("type", "subscribe")
        .attr("to", to.to_string())
        .build()
}

/// Read receipt for one message, addressed like a delivery receipt.
///
/// Group receipts go to the group and name the author as `participant`.
pub(super) fn read_receipt(id: &str, chat: &Jid, sender: &Jid) -> Node {
    let builder = NodeBuilder::new("receipt").attrs([
        ("id", id.to_string()),
        ("to", chat.to_string()),
        ("type", "read".to_string()),
    ]);
    if chat.is_group() {
        builder.attr("participant", sender.to_string()).build()
    } else {
        builder.build()
    }
}
