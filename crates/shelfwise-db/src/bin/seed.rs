//! # Seed Data Generator
//!
//! Populates a database with a small clothing shop for development.
//!
//! ## Usage
//! ```bash
//! # Default: ./shelfwise_dev.db, 60 orders
//! cargo run -p shelfwise-db --bin seed
//!
//! # More order history
//! cargo run -p shelfwise-db --bin seed -- --orders 500
//!
//! # Specify database path
//! cargo run -p shelfwise-db --bin seed -- --db ./data/shelfwise.db
//! ```
//!
//! ## What Gets Created
//! - Two locations: "Main Store" and "Warehouse"
//! - One supplier and one purchase order per garment, approved and received
//!   in full at the warehouse (so product costs come from real GRNs)
//! - A transfer of store stock from the warehouse
//! - A `WELCOME10` coupon
//! - Orders spread over the last 90 days, a few cancelled or returned
//! - A petty-cash float with some expenses

use chrono::{Duration, Utc};
use std::env;

use shelfwise_core::{
    DiscountType, NewCoupon, NewGrn, NewGrnLine, NewLocation, NewOrder, NewOrderItem,
    NewPettyCashEntry, NewProduct, NewPurchaseOrder, NewPurchaseOrderItem, NewSupplier,
    OrderSource, OrderStatus, PaymentMethod, PaymentStatus, PettyCashKind, TransferRequest,
};
use shelfwise_db::{Database, DbConfig};

/// Garments: (SKU prefix, name, category, selling price, supplier cost)
const GARMENTS: &[(&str, &str, &str, i64, i64)] = &[
    ("TEE-WHT", "Cotton Tee White", "tops", 2_500, 900),
    ("TEE-BLK", "Cotton Tee Black", "tops", 2_500, 900),
    ("POLO-NVY", "Pique Polo Navy", "tops", 3_900, 1_600),
    ("LIN-SHT", "Linen Shirt", "tops", 6_500, 2_800),
    ("DNM-SLM", "Slim Denim", "bottoms", 7_900, 3_500),
    ("CHN-BEI", "Chino Beige", "bottoms", 5_900, 2_400),
    ("SHT-CRG", "Cargo Shorts", "bottoms", 4_200, 1_700),
    ("DRS-FLR", "Floral Dress", "dresses", 8_900, 3_900),
    ("HOOD-GRY", "Hoodie Grey", "outerwear", 9_500, 4_200),
    ("CAP-BSB", "Baseball Cap", "accessories", 1_800, 600),
];

const SIZES: &[&str] = &["S", "M", "L"];

/// Units ordered per garment and size.
const PO_QUANTITY: i64 = 30;

/// Units moved to the store per garment and size.
const STORE_QUANTITY: i64 = 12;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut order_count: usize = 60;
    let mut db_path = String::from("./shelfwise_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    order_count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shelfwise Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of orders to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./shelfwise_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Shelfwise Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", order_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Locations and supplier
    let store = db
        .locations()
        .create(&NewLocation {
            name: "Main Store".to_string(),
            address: Some("12 Galle Road, Colombo 03".to_string()),
        })
        .await?;
    let warehouse = db
        .locations()
        .create(&NewLocation {
            name: "Warehouse".to_string(),
            address: None,
        })
        .await?;
    let supplier = db
        .suppliers()
        .create(&NewSupplier {
            name: "Lanka Textiles".to_string(),
            contact_person: Some("Nimal Perera".to_string()),
            email: Some("orders@lankatextiles.lk".to_string()),
            phone: Some("+94 11 234 5678".to_string()),
            address: None,
        })
        .await?;
    println!("✓ Created locations and supplier");

    // Catalog, purchasing and receipt
    let mut products = Vec::with_capacity(GARMENTS.len());
    for (sku, name, category, price, cost) in GARMENTS {
        let product = db
            .products()
            .create(&NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                category: Some(category.to_string()),
                brand: Some("Shelfwise Basics".to_string()),
                selling_price_cents: *price,
                cost_price_cents: 0,
            })
            .await?;

        let po = db
            .purchase_orders()
            .create(&NewPurchaseOrder {
                supplier_id: supplier.id.clone(),
                location_id: warehouse.id.clone(),
                notes: None,
                expected_at: None,
                items: SIZES
                    .iter()
                    .map(|size| NewPurchaseOrderItem {
                        product_id: product.id.clone(),
                        variant_id: String::new(),
                        size: size.to_string(),
                        quantity: PO_QUANTITY,
                        unit_cost_cents: *cost,
                    })
                    .collect(),
            })
            .await?;
        let po = db.purchase_orders().approve(&po.id).await?;

        db.grns()
            .receive(&NewGrn {
                purchase_order_id: po.id.clone(),
                notes: Some("seed".to_string()),
                lines: po
                    .items
                    .iter()
                    .map(|item| NewGrnLine {
                        po_item_id: item.id.clone(),
                        quantity_received: item.quantity_ordered,
                    })
                    .collect(),
            })
            .await?;

        for size in SIZES {
            db.inventory()
                .transfer_stock(&TransferRequest {
                    from_location_id: warehouse.id.clone(),
                    to_location_id: store.id.clone(),
                    product_id: product.id.clone(),
                    variant_id: String::new(),
                    size: size.to_string(),
                    quantity: STORE_QUANTITY,
                    note: Some("initial floor stock".to_string()),
                })
                .await?;
        }

        products.push(product);
    }
    println!("✓ Created {} products, received and transferred stock", products.len());

    db.coupons()
        .create(&NewCoupon {
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            value: 1_000,
            min_order_cents: 5_000,
            max_discount_cents: Some(2_000),
            usage_limit: None,
            starts_at: None,
            expires_at: None,
        })
        .await?;
    println!("✓ Created coupon WELCOME10");

    // Order history
    let now = Utc::now();
    let mut placed = 0;
    let mut skipped = 0;
    for n in 0..order_count {
        let first = &products[n % products.len()];
        let second = &products[(n * 7 + 3) % products.len()];
        let source = if n % 3 == 0 {
            OrderSource::Website
        } else {
            OrderSource::Store
        };

        let mut items = vec![NewOrderItem {
            product_id: first.id.clone(),
            variant_id: String::new(),
            size: SIZES[n % SIZES.len()].to_string(),
            quantity: 1 + (n % 2) as i64,
            unit_price_cents: None,
            discount_cents: 0,
        }];
        if second.id != first.id {
            items.push(NewOrderItem {
                product_id: second.id.clone(),
                variant_id: String::new(),
                size: SIZES[(n + 1) % SIZES.len()].to_string(),
                quantity: 1,
                unit_price_cents: None,
                discount_cents: 0,
            });
        }

        let website = source == OrderSource::Website;
        let input = NewOrder {
            source,
            location_id: store.id.clone(),
            customer_name: website.then(|| format!("Customer {}", n + 1)),
            customer_phone: None,
            customer_email: website.then(|| format!("customer{}@example.com", n + 1)),
            payment_method: if website {
                PaymentMethod::Card
            } else {
                PaymentMethod::Cash
            },
            payment_status: Some(PaymentStatus::Paid),
            coupon_code: (n % 5 == 0).then(|| "WELCOME10".to_string()),
            shipping_fee_cents: if website { 400 } else { 0 },
            transaction_fee_cents: if website { 150 } else { 0 },
            items,
        };

        let created_at = now - Duration::days(90) + Duration::hours((n as i64 * 2_160) / order_count.max(1) as i64);
        let order = match db.orders().create(&input, created_at).await {
            Ok(order) => order,
            Err(e) => {
                skipped += 1;
                eprintln!("  Skipped order {}: {}", n + 1, e);
                continue;
            }
        };
        placed += 1;

        let path: &[OrderStatus] = match n % 10 {
            0 => &[OrderStatus::Cancelled],
            1 => &[
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Returned,
            ],
            2..=5 => &[
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ],
            6 | 7 => &[OrderStatus::Processing],
            _ => &[],
        };
        for status in path {
            db.orders().update_status(&order.id, *status).await?;
        }
    }
    println!("✓ Placed {} orders ({} skipped)", placed, skipped);

    // Petty cash
    let expenses: &[(PettyCashKind, &str, i64)] = &[
        (PettyCashKind::TopUp, "float", 50_000),
        (PettyCashKind::Expense, "transport", 3_500),
        (PettyCashKind::Expense, "utilities", 12_000),
        (PettyCashKind::Expense, "packaging", 4_800),
        (PettyCashKind::Expense, "transport", 2_200),
    ];
    for (idx, (kind, category, cents)) in expenses.iter().enumerate() {
        db.petty_cash()
            .record(&NewPettyCashEntry {
                kind: *kind,
                category: category.to_string(),
                amount_cents: *cents,
                description: None,
                reference: None,
                occurred_at: Some(now - Duration::days(80 - idx as i64 * 15)),
            })
            .await?;
    }
    println!("✓ Recorded petty cash (balance {})", db.petty_cash().balance().await?);

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seed complete in {:?}", elapsed);

    let pnl = db
        .reports()
        .profit_and_loss(now - Duration::days(91), now + Duration::days(1))
        .await?;
    println!();
    println!("Last 90 days:");
    println!("  Net sales:    {}", pnl.net_sales);
    println!("  Gross profit: {} ({} bps)", pnl.gross_profit, pnl.gross_margin_bps);
    println!("  Net profit:   {}", pnl.net_profit);

    Ok(())
}
