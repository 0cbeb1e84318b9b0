use std::io::{self, Write};

use crate::db::Product;

pub const CSV_HEADER: &str = "category,name,description,price\n";

/// One CSV line per product, header first. Only the description is quoted.
pub fn csv_rows(products: &[Product]) -> impl Iterator<Item = String> + '_ {
    std::iter::once(CSV_HEADER.to_string()).chain(products.iter().map(csv_row))
}

/// Like [`csv_rows`], but owns the products so the rows can outlive the caller.
pub fn into_csv_rows(products: Vec<Product>) -> impl Iterator<Item = String> + Send + 'static {
    std::iter::once(CSV_HEADER.to_string()).chain(products.into_iter().map(|p| csv_row(&p)))
}

pub fn csv_row(p: &Product) -> String {
    format!(
        "{},{},\"{}\",{}\n",
        p.category,
        p.name,
        p.description.replace('"', "\"\""),
        p.price
    )
}

pub fn write_csv<W: Write>(mut out: W, products: &[Product]) -> io::Result<()> {
    for line in csv_rows(products) {
        out.write_all(line.as_bytes())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(category: &str, name: &str, description: &str, price: u16) -> Product {
        Product {
            category: category.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
        }
    }

    fn render(products: &[Product]) -> String {
        let mut buf = Vec::new();
        write_csv(&mut buf, products).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_only_for_empty_catalog() {
        assert_eq!(render(&[]), "category,name,description,price\n");
    }

    #[test]
    fn only_description_is_quoted() {
        let out = render(&[
            product("Drinks", "Tea", "Hot", 1500),
            product("Drinks", "Coffee", "", 2000),
        ]);
        assert_eq!(
            out,
            "category,name,description,price\n\
             Drinks,Tea,\"Hot\",1500\n\
             Drinks,Coffee,\"\",2000\n"
        );
    }

    #[test]
    fn round_trips_through_csv_reader() {
        let products = vec![
            product("Drinks", "Tea", "Hot, with lemon", 1500),
            product("", "Water", "", 0),
            product("Desserts", "Künefe", "\"Hatay\" style, 2 slices", 180),
        ];
        let out = render(&products);

        let mut reader = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, ["category", "name", "description", "price"]);

        let parsed: Vec<Product> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                product(&r[0], &r[1], &r[2], r[3].parse().unwrap())
            })
            .collect();
        assert_eq!(parsed, products);
    }

    #[test]
    fn streamed_rows_match_written_output() {
        let products = vec![product("Snacks", "Chips", "Salty", 900)];
        assert_eq!(csv_rows(&products).collect::<String>(), render(&products));
    }

    #[test]
    fn owned_rows_match_borrowed_rows() {
        let products = vec![
            product("Drinks", "Tea", "Hot", 1500),
            product("Snacks", "Chips", "Salty", 900),
        ];
        let borrowed: Vec<String> = csv_rows(&products).collect();
        let owned: Vec<String> = into_csv_rows(products).collect();
        assert_eq!(owned, borrowed);
        assert_eq!(owned.len(), 3);
    }
}
