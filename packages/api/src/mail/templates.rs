//! Plain-text bodies for the order notification emails.
//! Each helper returns `(subject, body)`.

pub fn order_accepted(order_id: i32) -> (String, String) {
    (
        format!("Your order #{} has been accepted", order_id),
        format!(
            "Thank you for your order #{} on our service.\n\n\
             We will let you know as soon as it ships.",
            order_id
        ),
    )
}

pub fn new_order_for_manager(order_id: i32, username: &str) -> (String, String) {
    (
        format!("New order #{}", order_id),
        format!(
            "A new order #{} has been placed by user {}.",
            order_id, username
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_reference_the_order() {
        let (subject, body) = order_accepted(17);
        assert!(subject.contains("#17"));
        assert!(body.contains("#17"));

        let (subject, body) = new_order_for_manager(17, "alice");
        assert!(subject.contains("#17"));
        assert!(body.contains("alice"));
    }
}
