use popscript::compile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let script = match compile(
        r#"
var attackers = 0;
const WAR_PARTY = 12;

every(128) {
    train(Warrior, 2);
    attackers += 2;
}

if(attackers >= WAR_PARTY) {
    attack(Blue, 12);
    attackers = 0;
}
"#,
    ) {
        Ok(script) => script,
        Err(errors) => {
            eprintln!("{errors}");
            std::process::exit(1);
        }
    };

    let mut out = Vec::new();
    script.write(&mut out)?;
    println!("compiled {} bytes, version {}", out.len(), script.version());
    Ok(())
}
