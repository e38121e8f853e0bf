use anyhow::Result;

use crate::auth::{StoredCredentials, subject_or};
use crate::cli::{OrdersArgs, OutputFormat};
use crate::client::MedimartClient;
use crate::output::{Column, print_list};

const BUYER_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Retailer", "retailerName"),
    ("Total", "totalAmount"),
    ("Status", "orderStatus"),
    ("Payment", "paymentStatus"),
    ("Placed", "createdAt"),
];

const RETAILER_COLUMNS: &[Column<'static>] = &[
    ("ID", "id"),
    ("Buyer", "buyerId"),
    ("Total", "totalAmount"),
    ("Status", "orderStatus"),
    ("Retailer status", "retailerStatus"),
    ("Rating", "feedback.rating"),
];

pub async fn list(
    client: &MedimartClient,
    args: &OrdersArgs,
    creds: Option<&StoredCredentials>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(retailer) = &args.retailer {
        let query: Vec<(&str, &str)> = args.status.iter().map(|s| ("status", s.as_str())).collect();
        let orders = client
            .get(&format!("retailers/{retailer}/orders"), &query)
            .await?;
        print_list(&orders, RETAILER_COLUMNS, format, "No orders found.");
        return Ok(());
    }
    let buyer = subject_or(args.buyer.as_deref(), creds, "buyer")?;
    let orders = client.get(&format!("orders/buyer/{buyer}"), &()).await?;
    print_list(&orders, BUYER_COLUMNS, format, "No orders found.");
    Ok(())
}
