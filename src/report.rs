//! Sales reporting: time-bucketed totals and top-5 rankings.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;

/// Aggregation unit for period buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

impl GroupBy {
    /// Bucket key for a date: day `YYYY-MM-DD`, week `YYYY-Www` (ISO),
    /// month `YYYY-MM`.
    pub fn period_key(&self, date: NaiveDate) -> String {
        match self {
            GroupBy::Day => date.format("%Y-%m-%d").to_string(),
            GroupBy::Week => {
                let iso = date.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            GroupBy::Month => date.format("%Y-%m").to_string(),
        }
    }

    /// Next bucket start; iteration advances by the grouping unit.
    fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            GroupBy::Day => date.checked_add_days(Days::new(1)),
            GroupBy::Week => date.checked_add_days(Days::new(7)),
            GroupBy::Month => date.checked_add_months(Months::new(1)),
        }
    }
}

impl FromStr for GroupBy {
    type Err = std::convert::Infallible;

    /// Unrecognized values default to day, matching the report endpoint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "week" => GroupBy::Week,
            "month" => GroupBy::Month,
            _ => GroupBy::Day,
        })
    }
}

/// One order as the aggregator sees it.
#[derive(Debug, Clone)]
pub struct ReportOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub total_price: Decimal,
    pub order_date: NaiveDate,
    pub items: Vec<ReportItem>,
}

#[derive(Debug, Clone)]
pub struct ReportItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSales {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub group_by: GroupBy,
    pub total_sales: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
    pub sales_by_period: BTreeMap<String, Decimal>,
    pub orders_by_period: BTreeMap<String, i64>,
    pub top_selling_products: Vec<ProductSales>,
    pub top_spending_customers: Vec<CustomerSales>,
}

const TOP_N: usize = 5;

/// Average rounded to 2 decimal places, half-up.
pub fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Aggregate orders whose date falls within [start, end] inclusive.
///
/// Every period bucket in the range is initialized to zero up front so
/// empty periods appear in the output rather than being omitted.
pub fn build_sales_report(
    start_date: NaiveDate,
    end_date: NaiveDate,
    group_by: GroupBy,
    orders: &[ReportOrder],
) -> Result<SalesReport, Error> {
    if start_date > end_date {
        return Err(Error::InvalidArgument(
            "start date must not be after end date".into(),
        ));
    }

    let mut sales_by_period = BTreeMap::new();
    let mut orders_by_period = BTreeMap::new();
    let mut current = start_date;
    while current <= end_date {
        let key = group_by.period_key(current);
        sales_by_period.entry(key.clone()).or_insert(Decimal::ZERO);
        orders_by_period.entry(key).or_insert(0i64);
        match group_by.advance(current) {
            Some(next) => current = next,
            None => break,
        }
    }

    let in_range: Vec<&ReportOrder> = orders
        .iter()
        .filter(|o| o.order_date >= start_date && o.order_date <= end_date)
        .collect();

    let total_sales: Decimal = in_range.iter().map(|o| o.total_price).sum();
    let total_orders = in_range.len() as i64;

    for order in &in_range {
        let key = group_by.period_key(order.order_date);
        *sales_by_period.entry(key.clone()).or_insert(Decimal::ZERO) += order.total_price;
        *orders_by_period.entry(key).or_insert(0) += 1;
    }

    // Rank products by revenue.
    let mut product_sales: HashMap<Uuid, ProductSales> = HashMap::new();
    for order in &in_range {
        for item in &order.items {
            let entry = product_sales
                .entry(item.product_id)
                .or_insert_with(|| ProductSales {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity_sold: 0,
                    total_revenue: Decimal::ZERO,
                });
            entry.quantity_sold += i64::from(item.quantity);
            entry.total_revenue += item.price * Decimal::from(item.quantity);
        }
    }
    let mut top_selling_products: Vec<ProductSales> = product_sales.into_values().collect();
    top_selling_products.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    top_selling_products.truncate(TOP_N);

    // Rank customers by total spend.
    let mut customer_sales: HashMap<Uuid, CustomerSales> = HashMap::new();
    for order in &in_range {
        let entry = customer_sales
            .entry(order.user_id)
            .or_insert_with(|| CustomerSales {
                user_id: order.user_id,
                email: order.customer_email.clone(),
                name: order.customer_name.clone(),
                order_count: 0,
                total_spent: Decimal::ZERO,
            });
        entry.order_count += 1;
        entry.total_spent += order.total_price;
    }
    let mut top_spending_customers: Vec<CustomerSales> = customer_sales.into_values().collect();
    top_spending_customers.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    top_spending_customers.truncate(TOP_N);

    Ok(SalesReport {
        start_date,
        end_date,
        group_by,
        total_sales,
        total_orders,
        average_order_value: average(total_sales, total_orders),
        sales_by_period,
        orders_by_period,
        top_selling_products,
        top_spending_customers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(user: Uuid, day: NaiveDate, total: Decimal) -> ReportOrder {
        ReportOrder {
            id: Uuid::new_v4(),
            user_id: user,
            customer_name: "Jane Doe".into(),
            customer_email: "jane@example.com".into(),
            total_price: total,
            order_date: day,
            items: vec![],
        }
    }

    #[test]
    fn inverted_range_is_invalid_argument() {
        let err = build_sales_report(date(2024, 2, 1), date(2024, 1, 1), GroupBy::Day, &[])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn group_by_parses_with_day_default() {
        assert_eq!("week".parse::<GroupBy>().unwrap(), GroupBy::Week);
        assert_eq!("MONTH".parse::<GroupBy>().unwrap(), GroupBy::Month);
        assert_eq!("fortnight".parse::<GroupBy>().unwrap(), GroupBy::Day);
    }

    #[test]
    fn empty_periods_appear_with_zeroes() {
        // 2024-01-01..2024-01-03 daily: three buckets, one order on day two.
        let orders = vec![order(Uuid::new_v4(), date(2024, 1, 2), Decimal::new(1000, 2))];
        let report =
            build_sales_report(date(2024, 1, 1), date(2024, 1, 3), GroupBy::Day, &orders).unwrap();

        assert_eq!(report.sales_by_period.len(), 3);
        assert_eq!(report.sales_by_period["2024-01-01"], Decimal::ZERO);
        assert_eq!(report.sales_by_period["2024-01-02"], Decimal::new(1000, 2));
        assert_eq!(report.sales_by_period["2024-01-03"], Decimal::ZERO);
        assert_eq!(report.orders_by_period["2024-01-02"], 1);
        assert_eq!(report.total_orders, 1);
    }

    #[test]
    fn orders_outside_range_are_excluded() {
        let orders = vec![
            order(Uuid::new_v4(), date(2024, 1, 1), Decimal::new(1000, 2)),
            order(Uuid::new_v4(), date(2024, 2, 1), Decimal::new(9999, 2)),
        ];
        let report =
            build_sales_report(date(2024, 1, 1), date(2024, 1, 31), GroupBy::Day, &orders).unwrap();
        assert_eq!(report.total_sales, Decimal::new(1000, 2));
        assert_eq!(report.total_orders, 1);
    }

    #[test]
    fn average_rounds_half_up() {
        // 10.00 + 10.01 over 3 orders: 20.01 / 3 = 6.67 exactly; use a case
        // that actually exercises the midpoint: 0.125 * 2dp -> 0.13.
        assert_eq!(average(Decimal::new(125, 3), 1), Decimal::new(13, 2));
        assert_eq!(average(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average(Decimal::new(2001, 2), 3), Decimal::new(667, 2));
    }

    #[test]
    fn weekly_buckets_use_iso_week_keys() {
        // 2024-01-01 is a Monday, ISO week 1 of 2024.
        let report =
            build_sales_report(date(2024, 1, 1), date(2024, 1, 15), GroupBy::Week, &[]).unwrap();
        let keys: Vec<&String> = report.sales_by_period.keys().collect();
        assert_eq!(keys, ["2024-W01", "2024-W02", "2024-W03"]);
    }

    #[test]
    fn monthly_buckets_advance_by_month() {
        let report =
            build_sales_report(date(2023, 11, 15), date(2024, 1, 15), GroupBy::Month, &[]).unwrap();
        let keys: Vec<&String> = report.sales_by_period.keys().collect();
        assert_eq!(keys, ["2023-11", "2023-12", "2024-01"]);
    }

    #[test]
    fn rankings_cap_at_five_and_sort_descending() {
        let mut orders = Vec::new();
        for i in 1..=7i64 {
            let mut o = order(Uuid::new_v4(), date(2024, 1, 1), Decimal::from(i * 10));
            o.items = vec![ReportItem {
                product_id: Uuid::new_v4(),
                product_name: format!("P{i}"),
                quantity: i as i32,
                price: Decimal::from(10),
            }];
            orders.push(o);
        }
        let report =
            build_sales_report(date(2024, 1, 1), date(2024, 1, 1), GroupBy::Day, &orders).unwrap();

        assert_eq!(report.top_selling_products.len(), 5);
        assert_eq!(report.top_spending_customers.len(), 5);
        assert_eq!(report.top_selling_products[0].total_revenue, Decimal::from(70));
        assert_eq!(report.top_selling_products[0].quantity_sold, 7);
        assert_eq!(report.top_spending_customers[0].total_spent, Decimal::from(70));
        assert!(report
            .top_spending_customers
            .windows(2)
            .all(|w| w[0].total_spent >= w[1].total_spent));
    }

    #[test]
    fn repeat_customer_accumulates_spend_and_count() {
        let user = Uuid::new_v4();
        let orders = vec![
            order(user, date(2024, 1, 1), Decimal::from(10)),
            order(user, date(2024, 1, 2), Decimal::from(15)),
        ];
        let report =
            build_sales_report(date(2024, 1, 1), date(2024, 1, 2), GroupBy::Day, &orders).unwrap();
        assert_eq!(report.top_spending_customers.len(), 1);
        assert_eq!(report.top_spending_customers[0].order_count, 2);
        assert_eq!(report.top_spending_customers[0].total_spent, Decimal::from(25));
    }
}
