//! Random laptop generation for the demo client and tests

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::catalog::v1::{memory, Cpu, Laptop, Memory};

const BRANDS: &[(&str, &[&str])] = &[
    ("Apple", &["Macbook Air", "Macbook Pro"]),
    ("Dell", &["Latitude", "Vostro", "XPS", "Alienware"]),
    ("Lenovo", &["Thinkpad X1", "Thinkpad P1", "Thinkpad P53"]),
];

const CPU_BRANDS: &[(&str, &[&str])] = &[
    ("Intel", &["Xeon E-2286M", "Core i9-9980HK", "Core i7-9750H", "Core i5-9400F"]),
    ("AMD", &["Ryzen 7 PRO 2700U", "Ryzen 5 PRO 3500U", "Ryzen 3 PRO 3200GE"]),
];

pub fn new_laptop() -> Laptop {
    let mut rng = rand::thread_rng();

    let (brand, names) = BRANDS.choose(&mut rng).unwrap();
    let name = names.choose(&mut rng).unwrap();
    let (cpu_brand, cpu_names) = CPU_BRANDS.choose(&mut rng).unwrap();
    let cpu_name = cpu_names.choose(&mut rng).unwrap();

    let number_cores = rng.gen_range(2..=8);
    let min_ghz = rng.gen_range(2.0..3.5);

    Laptop {
        id: Uuid::new_v4().to_string(),
        brand: brand.to_string(),
        name: name.to_string(),
        cpu: Some(Cpu {
            brand: cpu_brand.to_string(),
            name: cpu_name.to_string(),
            number_cores,
            number_threads: number_cores * 2,
            min_ghz,
            max_ghz: min_ghz + rng.gen_range(0.5..2.0),
        }),
        ram: Some(Memory {
            value: *[4u64, 8, 16, 32, 64].choose(&mut rng).unwrap(),
            unit: memory::Unit::Gigabyte as i32,
        }),
        weight_kg: rng.gen_range(1.0..3.0),
        price_usd: rng.gen_range(1500.0..3500.0),
        release_year: rng.gen_range(2019..=2023),
    }
}
